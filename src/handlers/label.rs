use super::paths;
use crate::engine::{ActionChain, FormValues, SessionContext, Step, StepRequest, StepResponse};
use crate::output::{self, OutputFormatter};
use crate::{PanelError, Result};
use scraper::Html;
use serde::Serialize;

pub const MAX_LABEL_CHARS: usize = 20;

pub fn validate_label(label: &str) -> Result<()> {
    if label.is_empty() {
        return Err(PanelError::InvalidArgument("label must not be empty".into()));
    }
    if label.chars().count() > MAX_LABEL_CHARS {
        return Err(PanelError::InvalidArgument(format!(
            "label is too long (should be {} characters or less)",
            MAX_LABEL_CHARS
        )));
    }
    Ok(())
}

/// The label endpoint is a plain AJAX form: it ignores the carried hidden
/// state and answers with a status code only.
pub fn label_step(session: &SessionContext, id: &str, label: &str) -> Result<Step> {
    let url = session.endpoint(paths::CHANGE_LABEL)?;
    let mut form = FormValues::new();
    form.add("eid", id).add("label", label).add("type", "vm");

    Ok(Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::post_form(url.clone(), &form)) },
        |resp: &StepResponse, _: &Html| -> Result<()> { resp.ensure_ok() },
    ))
}

#[derive(Debug, Serialize)]
pub struct LabelResult {
    pub id: String,
    pub label: String,
}

impl OutputFormatter for LabelResult {
    fn format_text(&self) -> String {
        output::text::success(&format!("VPS label was changed to \"{}\"", self.label))
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn handle_label(session: &mut SessionContext, id: &str, label: &str) -> Result<LabelResult> {
    validate_label(label)?;

    let mut chain = ActionChain::new();
    chain.add_step(label_step(session, id, label)?)?;
    chain.run(session).await?;

    tracing::info!(id, label, "VPS label changed");
    Ok(LabelResult {
        id: id.to_string(),
        label: label.to_string(),
    })
}
