use serde::{Deserialize, Serialize};

/// The action proposed by the model on a single turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionCall {
    /// The tool to invoke, addressed by registry name
    #[serde(default)]
    pub name: String,
    /// The raw input handed to the tool
    #[serde(default)]
    pub input: String,
}

/// The JSON record exchanged with the model on every turn of the loop.
///
/// Every field defaults to empty so that partial objects still parse; the
/// loop always overwrites `observation` with the truncated tool output
/// before echoing the envelope back, regardless of what the model wrote
/// there.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub thought: String,
    #[serde(default)]
    pub action: ActionCall,
    #[serde(default)]
    pub observation: String,
    #[serde(default)]
    pub final_answer: String,
}
