extern crate alloc;

pub mod bot;
pub mod corpus;
pub mod correlator;
pub mod discord;
pub mod dispatcher;
pub mod error;
pub mod interaction;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod transport;

#[cfg(test)]
mod testing;

use bot::Bot;
use ed25519_dalek::VerifyingKey;
use http_body_util::Full;
use hyper::{
    body::{Body, Bytes},
    header::{HeaderValue, CONTENT_TYPE},
    Request, Response, StatusCode,
};

pub use ed25519_dalek;

pub struct App {
    bot: Bot,
    public: VerifyingKey,
}

impl App {
    pub fn new(bot: Bot, public: VerifyingKey) -> Self {
        Self { bot, public }
    }

    /// Serves a single webhook request from Discord.
    pub async fn respond<B: Body>(&self, req: Request<B>) -> Response<Full<Bytes>> {
        let (parts, body) = req.into_parts();
        let result = match interaction::try_parse(&parts.method, &parts.uri, &parts.headers, body, &self.public).await {
            Ok(interaction) => {
                let reply = self.bot.on_message(interaction).await;
                serde_json::to_vec(&reply).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
            }
            Err(code) => Err(code),
        };

        match result {
            Ok(bytes) => {
                let mut res = Response::new(Full::new(Bytes::from(bytes)));
                res.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                res
            }
            Err(code) => {
                log::debug!("rejected webhook request with {code}");
                let mut res = Response::new(Full::default());
                *res.status_mut() = code;
                res
            }
        }
    }
}
