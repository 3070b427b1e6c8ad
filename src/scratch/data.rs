use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ScratchNote {
    pub content: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SetScratchRequest {
    pub content: String,
}
