mod error;

use crate::{
    correlator::{Answer, Correlator},
    corpus::Corpus,
    discord::{button_row, ANSWER_ID},
    dispatcher::Dispatcher,
    registry::Registry,
    transport::Transport,
};
use alloc::{
    string::{String, ToString},
    sync::Arc,
    vec::Vec,
};
use chrono::{DateTime, TimeDelta, Utc};
use core::num::NonZeroU64;
use model::Subscriber;
use twilight_model::{
    application::interaction::{
        application_command::{CommandData, CommandDataOption, CommandOptionValue},
        Interaction, InteractionData, InteractionType,
    },
    channel::message::{Component, MessageFlags},
    http::interaction::{InteractionResponse, InteractionResponseData, InteractionResponseType},
    user::User,
};

/// Custom ID of the "send me a question" button.
const QUIZ_ID: &str = "quiz";
/// Prefix of the interval buttons. The suffix is the number of hours.
const INTERVAL_PREFIX: &str = "interval:";
/// Longest accepted interval: one year.
const MAX_INTERVAL_HOURS: i64 = 24 * 365;

const HELP: &str = "**Available commands**\n\
    `/start` subscribes this channel to periodic questions.\n\
    `/quiz` sends a question right away.\n\
    `/stats` shows how well this channel has been doing.\n\
    `/interval hours` sets the time between questions.\n\
    `/section name` switches to a different question pool.\n\
    `/next` shows when the next question arrives.\n\
    `/help` shows this message.";

pub struct Bot {
    registry: Arc<Registry>,
    corpus: Arc<Corpus>,
    dispatcher: Arc<Dispatcher>,
    correlator: Correlator,
    transport: Arc<dyn Transport>,
}

fn ephemeral(content: String) -> InteractionResponse {
    InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(InteractionResponseData {
            content: Some(content),
            flags: Some(MessageFlags::EPHEMERAL),
            ..Default::default()
        }),
    }
}

fn public(content: String) -> InteractionResponse {
    InteractionResponse {
        kind: InteractionResponseType::ChannelMessageWithSource,
        data: Some(InteractionResponseData { content: Some(content), ..Default::default() }),
    }
}

fn timestamp(at: DateTime<Utc>) -> String {
    alloc::format!("<t:{}:R>", at.timestamp())
}

fn hours(interval: TimeDelta) -> String {
    match interval.num_hours() {
        1 => String::from("1 hour"),
        n if n > 0 && interval == TimeDelta::hours(n) => alloc::format!("{n} hours"),
        _ => alloc::format!("{} minutes", interval.num_minutes()),
    }
}

/// Parses the select menu values back into choice indices.
fn parse_picked(values: &[String]) -> Option<Vec<u16>> {
    values.iter().map(|value| value.parse().ok()).collect()
}

fn parse_interval_button(custom_id: &str) -> Option<i64> {
    custom_id.strip_prefix(INTERVAL_PREFIX)?.parse().ok()
}

fn interval_from_hours(hours: i64) -> Option<TimeDelta> {
    if !(1..=MAX_INTERVAL_HOURS).contains(&hours) {
        return None;
    }
    TimeDelta::try_hours(hours)
}

fn format_stats(sub: &Subscriber) -> String {
    let Some(accuracy) = sub.accuracy() else {
        return alloc::format!(
            "You haven't answered any questions yet. I have sent you {} so far.",
            sub.questions_sent
        );
    };
    alloc::format!(
        "You have answered {asked} questions with an accuracy of {correct}/{asked} ({accuracy}%).\n\
         I have sent you {sent} questions.",
        asked = sub.questions_asked,
        correct = sub.questions_correct,
        sent = sub.questions_sent,
    )
}

fn setup_components() -> Vec<Component> {
    alloc::vec![
        button_row(&[("interval:1", "Every hour"), ("interval:3", "Every 3 hours"), ("interval:5", "Every 5 hours")]),
        button_row(&[(QUIZ_ID, "Send me a question!")]),
    ]
}

fn display_name(user: Option<&User>) -> Option<&str> {
    user.map(|user| user.name.as_str())
}

impl Bot {
    pub fn new(
        registry: Arc<Registry>,
        corpus: Arc<Corpus>,
        dispatcher: Arc<Dispatcher>,
        correlator: Correlator,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self { registry, corpus, dispatcher, correlator, transport }
    }

    pub async fn on_message(&self, interaction: Interaction) -> InteractionResponse {
        let result = match interaction.kind {
            InteractionType::Ping => Ok(InteractionResponse { kind: InteractionResponseType::Pong, data: None }),
            InteractionType::ApplicationCommand => self.on_app_command(interaction).await,
            InteractionType::MessageComponent => self.on_msg_component(interaction).await,
            _ => Err(error::Error::UnsupportedInteraction),
        };

        match result {
            Ok(res) => res,
            Err(err) => ephemeral(err.to_string()),
        }
    }

    /// Refreshes the display name of a registered channel.
    async fn observe(&self, channel: NonZeroU64, user: Option<&User>) -> error::Result<()> {
        let name = display_name(user);
        self.registry
            .update_if(channel, |sub| {
                let before = sub.display_name.clone();
                sub.observe_name(name);
                before != sub.display_name
            })
            .await
            .map(drop)
            .ok_or(error::Error::NotRegistered)
    }

    async fn on_app_command(&self, interaction: Interaction) -> error::Result<InteractionResponse> {
        #[allow(deprecated)]
        let channel = interaction.channel_id.ok_or(error::Error::UnknownChannel)?.into_nonzero();
        let user = interaction.member.and_then(|member| member.user).or(interaction.user);
        let data = interaction.data.ok_or(error::Error::Fatal)?;
        let InteractionData::ApplicationCommand(data) = data else {
            return Err(error::Error::Fatal);
        };

        let CommandData { name, options, .. } = *data;
        let now = Utc::now();
        match name.as_str() {
            "start" => return self.on_start(channel, user.as_ref(), now).await,
            "help" => return Ok(ephemeral(String::from(HELP))),
            _ => {}
        }

        self.observe(channel, user.as_ref()).await?;
        match name.as_str() {
            "quiz" => self.on_quiz(channel).await,
            "stats" => self.on_stats(channel).await,
            "interval" => {
                let [CommandDataOption { name, value: CommandOptionValue::Integer(hours) }] = options.as_slice() else {
                    return Err(error::Error::InvalidParams);
                };
                if name != "hours" {
                    return Err(error::Error::UnknownCommandName);
                }
                self.on_interval(channel, *hours, now).await
            }
            "section" => {
                let [CommandDataOption { name, value: CommandOptionValue::String(section) }] = options.as_slice()
                else {
                    return Err(error::Error::InvalidParams);
                };
                if name != "name" {
                    return Err(error::Error::UnknownCommandName);
                }
                self.on_section(channel, section).await
            }
            "next" => self.on_next(channel).await,
            _ => Err(error::Error::UnknownCommandName),
        }
    }

    async fn on_start(
        &self,
        channel: NonZeroU64,
        user: Option<&User>,
        now: DateTime<Utc>,
    ) -> error::Result<InteractionResponse> {
        let (sub, created) = self.registry.register(channel, now).await;
        self.observe(channel, user).await?;

        let mut content = String::new();
        if created {
            content.push_str("Welcome! Let's start off with a single question. :)\n");
            let dispatcher = Arc::clone(&self.dispatcher);
            let transport = Arc::clone(&self.transport);
            let announcement = alloc::format!(
                "You'll receive your next question {}. Use `/interval` to change how often.",
                timestamp(sub.next_delivery_at)
            );
            tokio::spawn(async move {
                if let Err(err) = dispatcher.deliver(channel).await {
                    log::error!("welcome delivery to {channel} failed: {err}");
                    return;
                }
                if let Err(err) = transport.send_message(channel, &announcement).await {
                    log::error!("failed to announce schedule to {channel}: {err}");
                }
            });
        }
        content.push_str("How often would you like a new question?");

        Ok(InteractionResponse {
            kind: InteractionResponseType::ChannelMessageWithSource,
            data: Some(InteractionResponseData {
                content: Some(content),
                components: Some(setup_components()),
                ..Default::default()
            }),
        })
    }

    /// Acknowledges right away. The question follows from a detached task so
    /// the interaction reply never waits on the transport.
    async fn on_quiz(&self, channel: NonZeroU64) -> error::Result<InteractionResponse> {
        if self.registry.get(channel).await.is_none() {
            return Err(error::Error::NotRegistered);
        }
        let dispatcher = Arc::clone(&self.dispatcher);
        let transport = Arc::clone(&self.transport);
        tokio::spawn(async move {
            let Err(err) = dispatcher.deliver(channel).await else {
                return;
            };
            log::error!("on-demand delivery to {channel} failed: {err}");
            if let Err(err) = transport.send_message(channel, &error::Error::Delivery.to_string()).await {
                log::error!("failed to report delivery failure to {channel}: {err}");
            }
        });
        Ok(ephemeral(String::from("Here comes a question!")))
    }

    async fn on_stats(&self, channel: NonZeroU64) -> error::Result<InteractionResponse> {
        let sub = self.registry.get(channel).await.ok_or(error::Error::NotRegistered)?;
        Ok(ephemeral(format_stats(&sub)))
    }

    async fn on_interval(
        &self,
        channel: NonZeroU64,
        hours: i64,
        now: DateTime<Utc>,
    ) -> error::Result<InteractionResponse> {
        let interval = interval_from_hours(hours).ok_or(error::Error::InvalidInterval)?;
        let next = self
            .registry
            .update(channel, |sub| sub.set_interval(interval, now).then_some(sub.next_delivery_at))
            .await
            .ok_or(error::Error::NotRegistered)?
            .ok_or(error::Error::InvalidInterval)?;
        Ok(public(alloc::format!(
            "Quiz interval set to {}! Your next question arrives {}.",
            self::hours(interval),
            timestamp(next)
        )))
    }

    async fn on_section(&self, channel: NonZeroU64, section: &str) -> error::Result<InteractionResponse> {
        if !self.corpus.has_section(section) {
            let sections: Vec<_> = self.corpus.sections().map(|name| alloc::format!("`{name}`")).collect();
            return Ok(ephemeral(alloc::format!(
                "{} Available sections: {}.",
                error::Error::UnknownSection,
                sections.join(", ")
            )));
        }
        self.registry
            .update_if(channel, |sub| {
                if sub.section == section {
                    return false;
                }
                sub.section = String::from(section);
                true
            })
            .await
            .ok_or(error::Error::NotRegistered)?;
        Ok(public(alloc::format!("Quiz selection set to `{section}`.")))
    }

    async fn on_next(&self, channel: NonZeroU64) -> error::Result<InteractionResponse> {
        let sub = self.registry.get(channel).await.ok_or(error::Error::NotRegistered)?;
        Ok(ephemeral(alloc::format!(
            "Your next question arrives {} (every {}).",
            timestamp(sub.next_delivery_at),
            hours(sub.interval)
        )))
    }

    async fn on_msg_component(&self, interaction: Interaction) -> error::Result<InteractionResponse> {
        let user = interaction.member.and_then(|member| member.user).or(interaction.user);
        let message = interaction.message.ok_or(error::Error::Fatal)?;
        let channel = message.channel_id.into_nonzero();
        let data = interaction.data.ok_or(error::Error::Fatal)?;
        let InteractionData::MessageComponent(data) = data else {
            return Err(error::Error::Fatal);
        };

        let now = Utc::now();
        if data.custom_id == ANSWER_ID {
            let picked = parse_picked(&data.values).ok_or(error::Error::InvalidParams)?;
            let answer = Answer { token: message.id.to_string().into_boxed_str(), picked, subscriber: channel };
            return Ok(self.on_answer(answer, user.as_ref(), now).await);
        }

        self.observe(channel, user.as_ref()).await?;
        if data.custom_id == QUIZ_ID {
            return self.on_quiz(channel).await;
        }

        let hours = parse_interval_button(&data.custom_id).ok_or(error::Error::UnknownCommandName)?;
        self.on_interval(channel, hours, now).await
    }

    /// The pending token is consumed even when the channel is not registered.
    async fn on_answer(&self, answer: Answer, user: Option<&User>, now: DateTime<Utc>) -> InteractionResponse {
        let channel = answer.subscriber;
        let verdict = self.correlator.resolve(answer, now).await;
        if let Err(err) = self.observe(channel, user).await {
            log::debug!("answer from {channel} without a subscription: {err:?}");
        }
        match verdict {
            Some(verdict) => public(verdict.feedback),
            // Already graded. Acknowledge without saying anything.
            None => InteractionResponse { kind: InteractionResponseType::DeferredUpdateMessage, data: None },
        }
    }
}
