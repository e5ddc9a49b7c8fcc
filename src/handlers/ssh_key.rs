use super::{CTL_NESTED, paths, selector};
use crate::engine::{ActionChain, FormValues, SessionContext, Shared, Step, StepRequest, StepResponse};
use crate::output::{self, OutputFormatter};
use crate::state::open_private;
use crate::{PanelError, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

static DOWNLOAD_BUTTONS: Lazy<Selector> = Lazy::new(|| {
    selector("#ContentPlaceHolder1_ContentPlaceHolder1_gridSSHKeyList .btnIconPrivateKeyDL02")
});

/// Default file name for the n-th key of an account.
pub fn default_key_path(account: &str, key_no: usize) -> PathBuf {
    PathBuf::from(format!("conoha-{}-{}.key", account, key_no))
}

/// `name` of the n-th (1-based) download button in the key list.
pub fn download_button_name(document: &Html, key_no: usize) -> Result<String> {
    key_no
        .checked_sub(1)
        .and_then(|i| document.select(&DOWNLOAD_BUTTONS).nth(i))
        .and_then(|button| button.value().attr("name"))
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| PanelError::ResultValidation("SSH Key not found.".into()))
}

/// Key list fetch followed by the download postback. The downloaded body is
/// written to `key` untouched.
pub fn ssh_key_steps(session: &SessionContext, key_no: usize, key: Shared<Vec<u8>>) -> Result<Vec<Step>> {
    let url = session.endpoint(paths::KEY_PAIR)?;
    let button = Shared::new(String::new());

    let fetch_url = url.clone();
    let found = button.clone();
    let fetch = Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::get(fetch_url.clone())) },
        move |_: &StepResponse, doc: &Html| -> Result<()> {
            found.set(download_button_name(doc, key_no)?);
            Ok(())
        },
    );

    let download = Step::raw(
        move |carried: &FormValues| -> Result<StepRequest> {
            let mut form = carried.clone();
            form.add(button.get(), "Private Key Download");
            form.add(format!("{CTL_NESTED}hfTargetKey"), "");
            Ok(StepRequest::post_form(url.clone(), &form))
        },
        move |resp: &StepResponse| -> Result<()> {
            resp.ensure_ok()?;
            key.set(resp.body.clone());
            Ok(())
        },
    );

    Ok(vec![fetch, download])
}

pub async fn download_ssh_key(session: &mut SessionContext, key_no: usize) -> Result<Vec<u8>> {
    let key = Shared::new(Vec::new());
    let mut chain = ActionChain::new();
    for step in ssh_key_steps(session, key_no, key.clone())? {
        chain.add_step(step)?;
    }
    chain.run(session).await?;
    Ok(key.take())
}

/// Writes the key readable by the owner only.
pub fn store_key(path: &Path, key: &[u8]) -> Result<()> {
    let mut file = open_private(path)?;
    file.write_all(key)?;
    Ok(())
}

#[derive(Debug, Serialize)]
pub struct SshKeyResult {
    pub path: String,
    pub bytes: usize,
}

impl OutputFormatter for SshKeyResult {
    fn format_text(&self) -> String {
        output::text::success(&format!(
            "Download is complete. A private key is stored in \"{}\".",
            self.path
        ))
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn handle_ssh_key(
    session: &mut SessionContext,
    key_no: usize,
    path: &Path,
) -> Result<SshKeyResult> {
    let key = download_ssh_key(session, key_no).await?;
    let path = std::path::absolute(path)?;
    store_key(&path, &key)?;

    tracing::info!(path = %path.display(), "Stored private key");
    Ok(SshKeyResult {
        path: path.display().to_string(),
        bytes: key.len(),
    })
}
