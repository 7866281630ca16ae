//! The email-to-message pipeline: extract, render, filter, and optionally deliver.

use std::io::Read;

use tracing::{debug, info};

use crate::config::MessageConfig;
use crate::deliver::Deliver;
use crate::error::Result;
use crate::filter::SkipFilter;
use crate::model::message::{ExtractedMessage, RenderContext};
use crate::parser::mime;
use crate::render::Renderer;

/// Everything needed to turn a raw email into a chat message.
///
/// Built once from configuration; compiling the template and the skip
/// patterns happens here, so configuration errors surface before any mail is
/// read. Processing never mutates the pipeline.
#[derive(Debug)]
pub struct Pipeline {
    renderer: Renderer,
    preface: String,
    epilogue: String,
    filter: SkipFilter,
}

/// Result of processing one email.
#[derive(Debug, Clone)]
pub struct Outcome {
    /// The extracted subject and body, with the body's provenance.
    pub message: ExtractedMessage,
    /// The templated chat message.
    pub rendered: String,
    /// `false` when a skip pattern vetoed delivery.
    pub forward: bool,
}

impl Pipeline {
    pub fn new(config: &MessageConfig) -> Result<Self> {
        let renderer = Renderer::new(config.template.as_deref())?;
        let filter = SkipFilter::new(&config.skip)?;
        debug!(
            custom_template = config.template.is_some(),
            skip_patterns = filter.len(),
            "Pipeline ready"
        );
        Ok(Self {
            renderer,
            preface: config.preface.clone(),
            epilogue: config.epilogue.clone(),
            filter,
        })
    }

    /// Extract, render and filter one raw email.
    pub fn process(&self, raw: &[u8]) -> Result<Outcome> {
        let message = mime::extract(raw)?;
        let ctx = RenderContext::new(&message, &self.preface, &self.epilogue);
        let rendered = self.renderer.render(&ctx)?;
        let forward = self.filter.should_forward(&rendered);

        debug!(source = %message.source, forward, "Processed message");
        Ok(Outcome {
            message,
            rendered,
            forward,
        })
    }

    /// Read one email to the end of `reader` and process it.
    pub fn process_reader(&self, mut reader: impl Read) -> Result<Outcome> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        self.process(&raw)
    }

    /// Read and process one email, then hand it to `deliver` unless it was
    /// vetoed.
    pub fn forward(
        &self,
        reader: impl Read,
        deliver: &dyn Deliver,
        room: &str,
    ) -> Result<Outcome> {
        let outcome = self.process_reader(reader)?;
        if outcome.forward {
            deliver.send(room, &outcome.rendered)?;
        } else {
            info!(subject = %outcome.message.subject, "Message skipped, not forwarding");
        }
        Ok(outcome)
    }
}
