use super::form::FormValues;
use super::hidden::harvest_hidden_fields;
use super::session::SessionContext;
use super::step::{Consumer, Step, StepResponse};
use crate::{PanelError, Result};
use scraper::Html;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainState {
    Idle,
    Running,
    Completed,
    Failed,
}

impl ChainState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// Ordered steps executed against one session. The step list is emptied on
/// every terminal transition, so running the same chain twice never
/// resubmits a form.
#[derive(Debug)]
pub struct ActionChain {
    steps: Vec<Step>,
    state: ChainState,
    seed: Option<FormValues>,
    exchanges: usize,
}

impl Default for ActionChain {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionChain {
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            state: ChainState::Idle,
            seed: None,
            exchanges: 0,
        }
    }

    pub fn state(&self) -> ChainState {
        self.state
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// HTTP exchanges performed by the most recent run.
    pub fn exchanges(&self) -> usize {
        self.exchanges
    }

    pub fn add_step(&mut self, step: Step) -> Result<&mut Self> {
        if self.state != ChainState::Idle {
            return Err(PanelError::Configuration(format!(
                "cannot add a step to a chain in state {:?}; clear it first",
                self.state
            )));
        }
        self.steps.push(step);
        Ok(self)
    }

    /// Carried parameters the first step of the next run starts from.
    /// Without a seed, each run starts from an empty set.
    pub fn seed(&mut self, values: FormValues) -> &mut Self {
        self.seed = Some(values);
        self
    }

    /// Drops any queued steps and seed and returns the chain to `Idle`.
    pub fn clear(&mut self) {
        self.steps.clear();
        self.seed = None;
        self.state = ChainState::Idle;
    }

    pub async fn run(&mut self, session: &mut SessionContext) -> Result<()> {
        self.state = ChainState::Running;
        self.exchanges = 0;
        session.replace_carried(self.seed.take().unwrap_or_default());

        let steps = std::mem::take(&mut self.steps);
        for step in steps {
            if let Err(err) = self.run_step(step, session).await {
                self.state = ChainState::Failed;
                return Err(err);
            }
        }

        self.state = ChainState::Completed;
        Ok(())
    }

    async fn run_step(&mut self, step: Step, session: &mut SessionContext) -> Result<()> {
        let Step { producer, consumer } = step;

        let request = producer.produce(session.carried_params())?;
        self.exchanges += 1;
        let response = session.exchange(request).await?;

        match consumer {
            Consumer::Document(mut consumer) => {
                let harvested = consume_document(&response, consumer.as_mut())?;
                session.replace_carried(harvested);
            }
            Consumer::Raw(mut consumer) => consumer.consume(&response)?,
        }
        Ok(())
    }
}

fn consume_document(
    response: &StepResponse,
    consumer: &mut dyn super::step::DocumentConsumer,
) -> Result<FormValues> {
    let text = response.text();
    let document = Html::parse_document(&text);
    consumer.consume(response, &document)?;
    Ok(harvest_hidden_fields(&document))
}
