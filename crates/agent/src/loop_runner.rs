//! The plan-execute-observe reasoning loop.

use async_stream::try_stream;
use futures::Stream;
use std::pin::Pin;
use std::sync::Arc;
use stepwise_core::error::{Error, Result, ToolError};
use stepwise_core::message::{Message, MessageToolCall};
use stepwise_core::provider::{ModelReply, Provider, ProviderRequest};
use stepwise_core::session::{ToolSession, ToolSessionConnector};
use stepwise_core::tool::CapabilityCatalog;
use tracing::{debug, info, warn};

use crate::plan::StepPlan;
use crate::prompt::{build_final_prompt, build_planning_prompt, build_summary_prompt};
use crate::stream_event::ProgressEvent;

/// Round budget when none is configured.
pub const DEFAULT_MAX_ROUNDS: usize = 6;

/// Lazy, finite stream of progress events for one run.
///
/// Dropping it cancels the run at its current suspension point and releases
/// the tool session.
pub type ProgressStream = Pin<Box<dyn Stream<Item = Result<ProgressEvent>> + Send>>;

/// Orchestrates planning, per-step tool rounds and the final answer.
///
/// Cheap to clone; every run gets its own [`StepPlan`] and tool session.
#[derive(Clone)]
pub struct ReasoningLoop {
    provider: Arc<dyn Provider>,
    connector: Arc<dyn ToolSessionConnector>,
    catalog: Arc<CapabilityCatalog>,
    max_rounds: usize,
    max_tokens: Option<u32>,
}

impl ReasoningLoop {
    pub fn new(
        provider: Arc<dyn Provider>,
        connector: Arc<dyn ToolSessionConnector>,
        catalog: Arc<CapabilityCatalog>,
    ) -> Self {
        Self {
            provider,
            connector,
            catalog,
            max_rounds: DEFAULT_MAX_ROUNDS,
            max_tokens: None,
        }
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Per-call token cap; `None` defers to the provider's configuration.
    pub fn with_max_tokens(mut self, max_tokens: Option<u32>) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn catalog(&self) -> &CapabilityCatalog {
        &self.catalog
    }

    pub fn max_rounds(&self) -> usize {
        self.max_rounds
    }

    /// Start a run for `input`.
    ///
    /// Nothing happens until the stream is polled. The stream ends after
    /// [`ProgressEvent::FinalAnswer`] or after the first `Err` item.
    pub fn run(&self, input: impl Into<String>) -> ProgressStream {
        Box::pin(self.clone().into_stream(input.into()))
    }

    /// Drive a run to completion, passing every event to `on_event`, and
    /// return the final answer.
    pub async fn run_to_answer(
        &self,
        input: impl Into<String>,
        mut on_event: impl FnMut(&ProgressEvent),
    ) -> Result<String> {
        use futures::StreamExt;

        let mut stream = self.run(input);
        let mut answer = None;
        while let Some(event) = stream.next().await {
            let event = event?;
            on_event(&event);
            if let ProgressEvent::FinalAnswer { answer: text } = event {
                answer = Some(text);
            }
        }
        answer.ok_or(Error::EmptyAnswer)
    }

    fn into_stream(self, input: String) -> impl Stream<Item = Result<ProgressEvent>> + Send {
        try_stream! {
            info!(rounds = self.max_rounds, "Starting reasoning run");

            // ── Planning ──
            let mut plan = StepPlan::new(input.clone());
            let planning = vec![
                Message::system(build_planning_prompt(&self.catalog)),
                Message::user(input),
            ];
            let reply = self.ask(planning).await?;
            plan.set_plan_from_text(&reply);
            debug!(steps = plan.steps().len(), "Plan parsed");
            yield ProgressEvent::Plan { rendered: plan.render() };

            if plan.is_empty() {
                info!("Planning produced no steps, finalizing immediately");
            } else {
                let mut session = self.connector.connect().await?;
                let mut completed = false;

                for round in 1..=self.max_rounds {
                    info!(round, step = plan.current_step().unwrap_or(""), "Round started");
                    yield ProgressEvent::Step {
                        round,
                        step: plan.current_step().map(str::to_string),
                    };

                    let request = ProviderRequest::new(vec![Message::user(plan.render())])
                        .with_tools(self.catalog.definitions())
                        .with_max_tokens(self.max_tokens);
                    let response = self.provider.complete(request).await?;

                    match response.into_reply() {
                        ModelReply::ToolCallBatch(calls) => {
                            for call in calls {
                                yield ProgressEvent::ToolCall {
                                    name: call.name.clone(),
                                    arguments: call.arguments.clone(),
                                };
                                let observation = self.dispatch(session.as_mut(), &plan, &call).await?;
                                plan.add_observation(observation);
                            }
                        }
                        ModelReply::PlainAnswer(text) => {
                            debug!(round, chars = text.chars().count(), "No tool requested this round");
                        }
                    }

                    if !plan.advance() {
                        completed = true;
                        break;
                    }
                }

                drop(session);
                ensure_completed(completed, self.max_rounds)?;
            }

            // ── Finalizing ──
            yield ProgressEvent::Finalizing;
            let answer = self.ask(vec![Message::user(build_final_prompt(&plan.render()))]).await?;
            let answer = non_empty(answer)?;
            info!(observations = plan.observations().len(), "Reasoning run finished");
            yield ProgressEvent::FinalAnswer { answer };
        }
    }

    /// Guard, invoke and summarize one tool request into an observation.
    async fn dispatch(
        &self,
        session: &mut dyn ToolSession,
        plan: &StepPlan,
        call: &MessageToolCall,
    ) -> Result<String> {
        self.catalog.ensure_registered(&call.name)?;
        let arguments = call
            .parse_arguments()
            .map_err(|reason| ToolError::InvalidArguments {
                tool_name: call.name.clone(),
                reason,
            })?;

        debug!(tool = %call.name, "Invoking tool");
        let output = session.call_tool(&call.name, arguments).await?;
        if output.is_error() {
            warn!(tool = %call.name, "Tool reported an error result");
        }

        self.ask(vec![Message::user(build_summary_prompt(
            &plan.render(),
            &output.to_prompt_text(),
        ))])
        .await
    }

    /// Tool-less model call; returns the reply text.
    async fn ask(&self, messages: Vec<Message>) -> Result<String> {
        let request = ProviderRequest::new(messages).with_max_tokens(self.max_tokens);
        let response = self.provider.complete(request).await?;
        Ok(response.message.content)
    }
}

fn ensure_completed(completed: bool, max_rounds: usize) -> Result<()> {
    if completed {
        Ok(())
    } else {
        warn!(max_rounds, "Round budget exhausted");
        Err(Error::RoundBudgetExhausted { max_rounds })
    }
}

fn non_empty(answer: String) -> Result<String> {
    if answer.trim().is_empty() {
        Err(Error::EmptyAnswer)
    } else {
        Ok(answer)
    }
}
