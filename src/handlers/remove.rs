use super::add::INFO_MESSAGE;
use super::vps::{Vm, parse_vm_list};
use super::{CTL_NESTED, paths, select_attr, select_text, selector, trim_cell};
use crate::engine::{ActionChain, FormValues, SessionContext, Shared, Step, StepRequest, StepResponse};
use crate::output::{self, OutputFormatter};
use crate::{PanelError, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;

static CONFIRM_BUTTON: Lazy<Selector> =
    Lazy::new(|| selector("#ContentPlaceHolder1_ContentPlaceHolder1_btnConfirm"));

fn require_confirm_button(doc: &Html, what: &str) -> Result<()> {
    if select_attr(doc, &CONFIRM_BUTTON, "value").unwrap_or_default().is_empty() {
        return Err(PanelError::ResultValidation(format!(
            "Server returned the invalid body ({} button is not included)",
            what
        )));
    }
    Ok(())
}

/// List refresh, row selection postback, confirm page, final submit.
///
/// The first step reloads the list so the postback carries fresh hidden
/// state, and checks that the selected row is still there. Rows are matched
/// by row id because VMs still being created share an empty VPS id.
pub fn remove_steps(session: &SessionContext, vm: &Vm, message: Shared<String>) -> Result<Vec<Step>> {
    let list_url = session.endpoint(paths::VPS_LIST)?;
    let delete_url = session.endpoint(paths::VPS_DELETE)?;
    let confirm_url = session.endpoint(paths::VPS_DELETE_CONFIRM)?;
    let row_id = vm.tr_id.clone();

    let id = vm.id.clone();
    let fetch_url = list_url.clone();
    let expected_row = row_id.clone();
    let refresh = Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::get(fetch_url.clone())) },
        move |_: &StepResponse, doc: &Html| -> Result<()> {
            let not_found = || PanelError::VpsNotFound {
                id: if id.is_empty() { expected_row.clone() } else { id.clone() },
            };
            let row = parse_vm_list(doc)?
                .into_iter()
                .find(|row| row.tr_id == expected_row)
                .ok_or_else(not_found)?;
            // the row moved to another VPS since the list was read
            if !id.is_empty() && row.id != id {
                return Err(not_found());
            }
            Ok(())
        },
    );

    let select = Step::document(
        move |carried: &FormValues| -> Result<StepRequest> {
            let mut form = carried.clone();
            form.set(
                format!("{CTL_NESTED}gridServiceList${}$ctl01", row_id),
                "on",
            );
            form.set("__EVENTTARGET", format!("{CTL_NESTED}btnDel"));
            StepRequest::post_form(list_url.clone(), &form).with_referer(&list_url)
        },
        |_: &StepResponse, doc: &Html| -> Result<()> { require_confirm_button(doc, "Confirm") },
    );

    let referer = delete_url.clone();
    let confirm = Step::document(
        move |carried: &FormValues| -> Result<StepRequest> {
            let mut form = carried.clone();
            form.set(format!("{CTL_NESTED}btnConfirm"), "確認");
            Ok(StepRequest::post_form(delete_url.clone(), &form))
        },
        |_: &StepResponse, doc: &Html| -> Result<()> { require_confirm_button(doc, "Submit") },
    );

    let submit = Step::document(
        move |carried: &FormValues| -> Result<StepRequest> {
            let mut form = carried.clone();
            form.set(format!("{CTL_NESTED}btnConfirm"), "決定");
            StepRequest::post_form(confirm_url.clone(), &form).with_referer(&referer)
        },
        move |_: &StepResponse, doc: &Html| -> Result<()> {
            let info = trim_cell(&select_text(doc, &INFO_MESSAGE));
            if info.is_empty() {
                return Err(PanelError::ResultValidation(
                    "Server returned the invalid body (info message is not included)".into(),
                ));
            }
            message.set(info);
            Ok(())
        },
    );

    Ok(vec![refresh, select, confirm, submit])
}

#[derive(Debug, Serialize)]
pub struct RemoveResult {
    pub id: String,
    pub label: String,
    pub removed: bool,
    pub message: String,
}

impl OutputFormatter for RemoveResult {
    fn format_text(&self) -> String {
        if self.removed {
            output::text::success("Removing VPS is complete.")
        } else {
            output::text::info(&format!("VPS {} was not removed", self.label))
        }
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

impl RemoveResult {
    pub fn skipped(vm: &Vm) -> Self {
        Self {
            id: vm.id.clone(),
            label: vm.label.clone(),
            removed: false,
            message: String::new(),
        }
    }
}

pub async fn handle_remove(session: &mut SessionContext, vm: &Vm) -> Result<RemoveResult> {
    let message = Shared::new(String::new());
    let mut chain = ActionChain::new();
    for step in remove_steps(session, vm, message.clone())? {
        chain.add_step(step)?;
    }
    chain.run(session).await?;

    tracing::info!(id = %vm.id, "Removing VPS is complete");
    Ok(RemoveResult {
        id: vm.id.clone(),
        label: vm.label.clone(),
        removed: true,
        message: message.take(),
    })
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const DELETE_CONFIRM: &str = r#"<html><body><form>
<input type="hidden" name="__VIEWSTATE" value="del-state">
<input type="hidden" name="__EVENTTARGET" value="">
<input type="submit" id="ContentPlaceHolder1_ContentPlaceHolder1_btnConfirm" value="確認">
</form></body></html>"#;
}
