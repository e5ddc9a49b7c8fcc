use super::{CTL_NESTED, element_text, paths, select_attr, select_text, selector, trim_cell};
use crate::engine::{ActionChain, FormValues, SessionContext, Shared, Step, StepRequest, StepResponse};
use crate::output::{self, OutputFormatter};
use crate::{PanelError, Result};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde::Serialize;
use std::str::FromStr;

static LINUX_PLANS: Lazy<Selector> = Lazy::new(|| selector("#trLinuxPlan li"));
static WINDOWS_PLANS: Lazy<Selector> = Lazy::new(|| selector("#trWindowsPlan li"));
static PLAN_INPUT: Lazy<Selector> = Lazy::new(|| selector("input"));
static SSH_KEY: Lazy<Selector> =
    Lazy::new(|| selector("#ContentPlaceHolder1_ContentPlaceHolder1_rbKey_0"));
static ERROR_MESSAGE: Lazy<Selector> = Lazy::new(|| selector(".errorMsg"));
static EXECUTE_BUTTON: Lazy<Selector> =
    Lazy::new(|| selector("#ContentPlaceHolder1_ContentPlaceHolder1_btnExecute"));
pub(crate) static INFO_MESSAGE: Lazy<Selector> = Lazy::new(|| selector("#ltInfoMessage"));

/// Memory sizes offered by both plan families, in the order the form lists them.
pub const PLAN_SIZES_GB: [u32; 5] = [1, 2, 4, 8, 16];

/// Plan id the form expects for the family that was not chosen.
const UNUSED_WINDOWS_PLAN: &str = "2364";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanType {
    Basic,
    Windows,
}

impl PlanType {
    pub fn form_value(self) -> u8 {
        match self {
            Self::Basic => 1,
            Self::Windows => 2,
        }
    }
}

impl FromStr for PlanType {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "basic" => Ok(Self::Basic),
            "windows" => Ok(Self::Windows),
            _ => Err(PanelError::InvalidArgument(
                r#"plan type should be "basic" or "windows""#.into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Template {
    Centos,
    Wordpress,
    Windows2012,
    Windows2008,
}

impl Template {
    /// Suffix of the panel's `default/N` image value.
    pub fn number(self) -> u8 {
        match self {
            Self::Centos => 1,
            Self::Wordpress => 2,
            Self::Windows2012 => 3,
            Self::Windows2008 => 4,
        }
    }

    pub fn plan_type(self) -> PlanType {
        match self {
            Self::Centos | Self::Wordpress => PlanType::Basic,
            Self::Windows2012 | Self::Windows2008 => PlanType::Windows,
        }
    }

    fn form_value(self) -> String {
        format!("default/{}", self.number())
    }
}

impl FromStr for Template {
    type Err = PanelError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "centos" => Ok(Self::Centos),
            "wordpress" => Ok(Self::Wordpress),
            "windows2012" => Ok(Self::Windows2012),
            "windows2008" => Ok(Self::Windows2008),
            _ => Err(PanelError::InvalidArgument(format!(
                "unknown template image {:?} (centos, wordpress, windows2012, windows2008)",
                s
            ))),
        }
    }
}

/// What to order. Validated before any request is made.
#[derive(Debug, Clone)]
pub struct AddOrder {
    pub plan_type: PlanType,
    pub plan_gb: u32,
    pub template: Template,
    pub root_password: String,
}

impl AddOrder {
    /// Checks the combination and returns the plan's position in the form.
    pub fn validate(&self) -> Result<usize> {
        let index = PLAN_SIZES_GB
            .iter()
            .position(|&gb| gb == self.plan_gb)
            .ok_or_else(|| {
                PanelError::InvalidArgument(format!(
                    "plan must be one of 1, 2, 4, 8, 16 (got {})",
                    self.plan_gb
                ))
            })?;

        if self.template.plan_type() != self.plan_type {
            return Err(PanelError::InvalidArgument(format!(
                "template {:?} is not available for the {:?} plan",
                self.template, self.plan_type
            )));
        }

        if self.plan_type == PlanType::Basic && self.root_password.is_empty() {
            return Err(PanelError::InvalidArgument("root password is required".into()));
        }

        Ok(index)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VpsPlan {
    pub label: String,
    pub plan_id: String,
}

/// Reads the five plans of one family, checking each label names the
/// expected memory size.
pub fn detect_plans(document: &Html, plan_type: PlanType) -> Result<Vec<VpsPlan>> {
    let items = match plan_type {
        PlanType::Basic => &LINUX_PLANS,
        PlanType::Windows => &WINDOWS_PLANS,
    };

    let count_error = |found: usize| {
        PanelError::ResponseParse(format!(
            "expected {} plans, found {}",
            PLAN_SIZES_GB.len(),
            found
        ))
    };

    let mut plans = Vec::new();
    for (i, item) in document.select(items).enumerate() {
        let Some(gb) = PLAN_SIZES_GB.get(i) else {
            return Err(count_error(i + 1));
        };
        let label = trim_cell(&element_text(item));
        if !label.contains(&format!("{}GB", gb)) {
            return Err(PanelError::ResponseParse(format!("Wrong plan name. [{}]", label)));
        }

        let plan_id = item
            .select(&PLAN_INPUT)
            .next()
            .and_then(|input| input.value().attr("value"))
            .unwrap_or_default()
            .to_string();
        plans.push(VpsPlan { label, plan_id });
    }

    if plans.len() != PLAN_SIZES_GB.len() {
        return Err(count_error(plans.len()));
    }

    Ok(plans)
}

#[derive(Debug, Clone, Default)]
struct FormSelection {
    plan: Option<VpsPlan>,
    ssh_key_id: String,
}

fn confirm_form(carried: &FormValues, order: &AddOrder, selection: &FormSelection) -> Result<FormValues> {
    let plan = selection.plan.as_ref().ok_or_else(|| {
        PanelError::RequestConstruction("no plan was selected from the add form".into())
    })?;
    let field = |name: &str| format!("{CTL_NESTED}{name}");

    let mut form = carried.clone();
    form.add(field("rbPlanCategory"), order.plan_type.form_value().to_string());

    match order.plan_type {
        PlanType::Basic => {
            form.add(field("rbLinuxPlan"), &plan.plan_id);
            form.add(field("rbWindowsPlan"), UNUSED_WINDOWS_PLAN);
        }
        PlanType::Windows => {
            form.add(field("rbLinuxPlan"), "");
            form.add(field("rbWindowsPlan"), &plan.plan_id);
        }
    }

    form.add(field("UnitMonth"), "selectCredit1");

    match order.plan_type {
        PlanType::Basic => {
            form.add(field("selLinuxOS"), order.template.form_value());
            form.add(field("selWindowsOS"), Template::Windows2012.form_value());
            form.add(field("txtRootPassword"), &order.root_password);
            form.add(field("txtConfirmPassword"), &order.root_password);
        }
        PlanType::Windows => {
            form.add(field("selLinuxOS"), Template::Centos.form_value());
            form.add(field("selWindowsOS"), order.template.form_value());
            form.add(field("txtRootPassword"), "");
            form.add(field("txtConfirmPassword"), "");
        }
    }

    form.add(field("rbKey"), &selection.ssh_key_id);
    form.add(field("btnConfirm"), "確認");
    form.add(field("hfCpu"), "2");
    form.add(field("hfDisk"), "100");
    form.add(field("hfMemory"), "1");
    form.add(field("hfInital"), "0円");
    form.add(field("hfRunning"), "507円");

    Ok(form)
}

/// Form fetch, confirm postback, and final submit. The last step's info
/// message is written to `message`.
pub fn add_steps(session: &SessionContext, order: &AddOrder, message: Shared<String>) -> Result<Vec<Step>> {
    let plan_index = order.validate()?;
    let selection = Shared::new(FormSelection::default());
    let form_url = session.endpoint(paths::VPS_ADD)?;
    let confirm_url = session.endpoint(paths::VPS_ADD_CONFIRM)?;

    let fetch_url = form_url.clone();
    let plan_type = order.plan_type;
    let detected = selection.clone();
    let fetch = Step::document(
        move |_: &FormValues| -> Result<StepRequest> { Ok(StepRequest::get(fetch_url.clone())) },
        move |_: &StepResponse, doc: &Html| -> Result<()> {
            let mut plans = detect_plans(doc, plan_type)?;
            let plan = plans.swap_remove(plan_index);
            tracing::debug!(plan = %plan.label, id = %plan.plan_id, "Selected plan");
            detected.set(FormSelection {
                plan: Some(plan),
                ssh_key_id: select_attr(doc, &SSH_KEY, "value").unwrap_or_default(),
            });
            Ok(())
        },
    );

    let order = order.clone();
    let confirm = Step::document(
        move |carried: &FormValues| -> Result<StepRequest> {
            let form = selection.with(|s| confirm_form(carried, &order, s))?;
            Ok(StepRequest::post_form(form_url.clone(), &form))
        },
        |_: &StepResponse, doc: &Html| -> Result<()> {
            if let Some(msg) = doc.select(&ERROR_MESSAGE).next() {
                return Err(PanelError::ResultValidation(trim_cell(&element_text(msg))));
            }
            if select_attr(doc, &EXECUTE_BUTTON, "value").unwrap_or_default().is_empty() {
                return Err(PanelError::ResultValidation(
                    "Server returned invalid html (submit button is not included)".into(),
                ));
            }
            Ok(())
        },
    );

    let submit = Step::document(
        move |carried: &FormValues| -> Result<StepRequest> {
            let mut form = carried.clone();
            form.add(format!("{CTL_NESTED}btnExecute"), "決定");
            Ok(StepRequest::post_form(confirm_url.clone(), &form))
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

    Ok(vec![fetch, confirm, submit])
}

#[derive(Debug, Serialize)]
pub struct AddResult {
    pub plan_type: PlanType,
    pub plan_gb: u32,
    pub template: Template,
    pub message: String,
}

impl OutputFormatter for AddResult {
    fn format_text(&self) -> String {
        format!(
            "{}\n{}",
            output::text::success("Adding VPS is complete."),
            output::text::key_value("Panel", &self.message)
        )
    }

    fn format_json(&self, pretty: bool) -> Result<String> {
        output::to_json(self, pretty)
    }
}

pub async fn handle_add(session: &mut SessionContext, order: &AddOrder) -> Result<AddResult> {
    let message = Shared::new(String::new());
    let mut chain = ActionChain::new();
    for step in add_steps(session, order, message.clone())? {
        chain.add_step(step)?;
    }
    chain.run(session).await?;

    tracing::info!("Adding VPS is complete");
    Ok(AddResult {
        plan_type: order.plan_type,
        plan_gb: order.plan_gb,
        template: order.template,
        message: message.take(),
    })
}
