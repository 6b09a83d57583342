//! LLM-backed extraction operations.
//!
//! Both operations read an input file, send it through the chat API
//! (text or vision) with a narrow extraction prompt, and write the
//! model's answer to an output file.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;

use crate::llm::OpenAiClient;

use super::{Operation, OperationResult, ParamKind, ParamSpec, TaskArgs};

/// Instruction sent alongside the card image.
const CARD_NUMBER_PROMPT: &str =
    "Extract and print only the long series of digits from the image, without any spaces.";

/// Extracts the sender's address from a stored email message.
pub struct ExtractSenderOp {
    llm: Arc<OpenAiClient>,
}

impl ExtractSenderOp {
    pub fn new(llm: Arc<OpenAiClient>) -> Self {
        Self { llm }
    }
}

const SENDER_PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "input_file",
        ParamKind::Path,
        "File containing the raw email message",
    ),
    ParamSpec::required(
        "output_file",
        ParamKind::Path,
        "File the extracted address is written to",
    ),
];

#[async_trait]
impl Operation for ExtractSenderOp {
    fn name(&self) -> &str {
        "extract_sender"
    }

    fn description(&self) -> &str {
        "Read an email message from a file, extract the sender's email address, \
         and write just that address to an output file."
    }

    fn params(&self) -> &[ParamSpec] {
        SENDER_PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let input_file = args.path("input_file")?;
        let output_file = args.path("output_file")?;

        let email = match tokio::fs::read_to_string(input_file).await {
            Ok(email) => email,
            Err(e) => {
                return Ok(OperationResult::failure(format!(
                    "Cannot read {input_file}: {e}"
                )))
            }
        };

        let answer = self.llm.complete_text(&sender_prompt(&email)).await?;
        tokio::fs::write(output_file, answer.trim()).await?;

        Ok(OperationResult::ok(format!(
            "Extracted the sender address from {input_file} into {output_file}."
        )))
    }
}

/// Builds the sender-extraction prompt around the raw message.
fn sender_prompt(email: &str) -> String {
    format!(
        "Extract the sender's email address from the following email message:\n\n\
         ```\n{email}\n```\n\n\
         Reply with only the sender's email address and nothing else."
    )
}

/// Reads the long digit sequence out of a card image via the vision API.
pub struct ExtractCardNumberOp {
    llm: Arc<OpenAiClient>,
}

impl ExtractCardNumberOp {
    pub fn new(llm: Arc<OpenAiClient>) -> Self {
        Self { llm }
    }
}

const CARD_PARAMS: &[ParamSpec] = &[
    ParamSpec::required(
        "input_file",
        ParamKind::Path,
        "Image file showing the card number",
    ),
    ParamSpec::required(
        "output_file",
        ParamKind::Path,
        "File the extracted digits are written to",
    ),
];

#[async_trait]
impl Operation for ExtractCardNumberOp {
    fn name(&self) -> &str {
        "extract_card_number"
    }

    fn description(&self) -> &str {
        "Read a card number from an image file and write the digit sequence, \
         without spaces, to an output file."
    }

    fn params(&self) -> &[ParamSpec] {
        CARD_PARAMS
    }

    async fn execute(&self, args: &TaskArgs) -> anyhow::Result<OperationResult> {
        let input_file = args.path("input_file")?;
        let output_file = args.path("output_file")?;

        let bytes = match tokio::fs::read(input_file).await {
            Ok(bytes) => bytes,
            Err(e) => {
                return Ok(OperationResult::failure(format!(
                    "Cannot read {input_file}: {e}"
                )))
            }
        };

        let data_url = image_data_url(input_file.as_path(), &bytes);
        let answer = self.llm.complete_vision(CARD_NUMBER_PROMPT, data_url).await?;
        tokio::fs::write(output_file, answer.trim()).await?;

        Ok(OperationResult::ok(format!(
            "Extracted the card number from {input_file} into {output_file}."
        )))
    }
}

/// Encodes an image as a base64 `data:` URL.
///
/// Media type comes from the file extension; unknown extensions fall
/// back to PNG, which matches what the generation script produces.
fn image_data_url(path: &Path, bytes: &[u8]) -> String {
    let media_type = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/png",
    };
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    format!("data:{media_type};base64,{encoded}")
}
