//! OCR engines: turn raw document bytes into typed text blocks.
//!
//! [`OcrEngine`] is the seam between the extractor and the cloud service.
//! [`TextractEngine`] calls AWS Textract `DetectDocumentText`; tests and
//! alternative backends implement the trait directly.

use crate::config::OcrCredentials;
use crate::error::{ExtractorError, ServiceStage};
use async_trait::async_trait;
use aws_sdk_textract::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_textract::error::{DisplayErrorContext, SdkError};
use aws_sdk_textract::primitives::Blob;
use aws_sdk_textract::types::{Block, BlockType, Document};
use aws_sdk_textract::{Client, Config};
use tracing::debug;

/// Block type tag reported by the OCR service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Page,
    Line,
    Word,
    Other(String),
}

/// One detected block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextBlock {
    pub kind: BlockKind,
    /// Present for `Line` and `Word` blocks.
    pub text: Option<String>,
}

impl TextBlock {
    pub fn line(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Line,
            text: Some(text.into()),
        }
    }

    pub fn word(text: impl Into<String>) -> Self {
        Self {
            kind: BlockKind::Word,
            text: Some(text.into()),
        }
    }

    pub fn page() -> Self {
        Self {
            kind: BlockKind::Page,
            text: None,
        }
    }
}

/// A document text detection backend.
///
/// `document` is a whole single-page PDF or a whole image file. Blocks are
/// returned in the order the service reports them.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    async fn detect_document_text(&self, document: &[u8]) -> Result<Vec<TextBlock>, ExtractorError>;
}

/// Append the text of every `Line` block, each followed by `\n`.
pub fn append_lines(out: &mut String, blocks: &[TextBlock]) -> Result<usize, ExtractorError> {
    let mut count = 0;
    for block in blocks.iter().filter(|b| b.kind == BlockKind::Line) {
        let text = block.text.as_deref().ok_or_else(|| {
            ExtractorError::malformed(ServiceStage::Ocr, "LINE block without text")
        })?;
        out.push_str(text);
        out.push('\n');
        count += 1;
    }
    Ok(count)
}

/// AWS Textract backend.
#[derive(Debug, Clone)]
pub struct TextractEngine {
    client: Client,
    service_name: String,
}

impl TextractEngine {
    /// Build a client from explicit credentials.
    ///
    /// `endpoint` overrides the regional endpoint.
    pub fn new(credentials: &OcrCredentials, endpoint: Option<&str>) -> Self {
        let creds = Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
            None,
            "t2-extractor",
        );

        let mut builder = Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(credentials.region.clone()))
            .credentials_provider(creds);
        if let Some(url) = endpoint {
            builder = builder.endpoint_url(url);
        }

        Self {
            client: Client::from_conf(builder.build()),
            service_name: credentials.service_name.clone(),
        }
    }

    fn convert_block(block: &Block) -> TextBlock {
        let kind = match block.block_type() {
            Some(BlockType::Page) => BlockKind::Page,
            Some(BlockType::Line) => BlockKind::Line,
            Some(BlockType::Word) => BlockKind::Word,
            Some(other) => BlockKind::Other(other.as_str().to_string()),
            None => BlockKind::Other(String::new()),
        };
        TextBlock {
            kind,
            text: block.text().map(str::to_string),
        }
    }
}

#[async_trait]
impl OcrEngine for TextractEngine {
    fn name(&self) -> &str {
        &self.service_name
    }

    #[tracing::instrument(skip(self, document), fields(service = %self.service_name, bytes = document.len()))]
    async fn detect_document_text(&self, document: &[u8]) -> Result<Vec<TextBlock>, ExtractorError> {
        let response = self
            .client
            .detect_document_text()
            .document(Document::builder().bytes(Blob::new(document.to_vec())).build())
            .send()
            .await
            .map_err(|e| match &e {
                SdkError::ResponseError(_) => ExtractorError::malformed(
                    ServiceStage::Ocr,
                    format!("{}", DisplayErrorContext(&e)),
                ),
                _ => ExtractorError::service(
                    ServiceStage::Ocr,
                    format!("DetectDocumentText failed: {}", DisplayErrorContext(&e)),
                ),
            })?;

        let blocks: Vec<TextBlock> = response.blocks().iter().map(Self::convert_block).collect();
        debug!("Textract returned {} blocks", blocks.len());
        Ok(blocks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_lines_keeps_only_lines_in_order() {
        let blocks = vec![
            TextBlock::page(),
            TextBlock::line("Invoice 42"),
            TextBlock::word("Invoice"),
            TextBlock::word("42"),
            TextBlock::line("Total: 10.00"),
        ];
        let mut out = String::new();
        let n = append_lines(&mut out, &blocks).unwrap();
        assert_eq!(n, 2);
        assert_eq!(out, "Invoice 42\nTotal: 10.00\n");
    }

    #[test]
    fn line_without_text_is_malformed() {
        let blocks = vec![TextBlock {
            kind: BlockKind::Line,
            text: None,
        }];
        let err = append_lines(&mut String::new(), &blocks).unwrap_err();
        assert!(matches!(
            err,
            ExtractorError::MalformedResponse {
                stage: ServiceStage::Ocr,
                ..
            }
        ));
    }

    #[test]
    fn convert_block_maps_types() {
        let block = Block::builder()
            .block_type(BlockType::Line)
            .text("hello")
            .build();
        assert_eq!(TextractEngine::convert_block(&block), TextBlock::line("hello"));

        let other = Block::builder().block_type(BlockType::Table).build();
        assert_eq!(
            TextractEngine::convert_block(&other).kind,
            BlockKind::Other("TABLE".to_string())
        );
    }
}
