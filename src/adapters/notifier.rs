//! Notification adapter: webhook plus message broker.
//!
//! Implements the delivery side of [`NotifierPort`] and the broker
//! session used by [`NetworkPort`](crate::app::ports::NetworkPort).
//!
//! | Target   | Payload                                           |
//! |----------|---------------------------------------------------|
//! | webhook  | `POST <WEBHOOK_BASE><key>` body `{"value1":text}` |
//! | broker   | `<name>/OUT/NOTIFY` text                          |
//! | broker   | `<name>/OUT/STATE` `OPEN` / `CLOSED`, and the     |
//! |          | bare `<name>` topic `Open` / `Closed`             |
//!
//! Incoming broker messages land in a bounded inbox that the main loop
//! drains; a full inbox drops the newest message.

use log::{info, warn};

use crate::app::ports::NotifyError;
use crate::config::{OptionKey, Options};

#[cfg(target_os = "espidf")]
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex,
};

#[cfg(target_os = "espidf")]
use esp_idf_svc::mqtt::client::{EspMqttClient, EspMqttConnection, MqttClientConfiguration};

#[cfg(target_os = "espidf")]
use embedded_svc::mqtt::client::{Details, EventPayload, QoS};

pub const WEBHOOK_BASE: &str = "http://maker.ifttt.com/trigger/opengarage/with/key/";
pub const BROKER_PORT: u16 = 1883;

/// Webhook keys up to this length are treated as unset.
const MIN_WEBHOOK_KEY_LEN: usize = 8;
const INBOX_CAPACITY: usize = 8;
#[cfg(target_os = "espidf")]
const MAX_BROKER_PAYLOAD: usize = 128;

/// One received broker message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerMessage {
    pub topic: String,
    pub payload: String,
}

type Inbox = heapless::Deque<BrokerMessage, INBOX_CAPACITY>;

pub fn webhook_body(text: &str) -> String {
    serde_json::json!({ "value1": text }).to_string()
}

pub fn notify_topic(name: &str) -> String {
    format!("{}/OUT/NOTIFY", name)
}

pub fn state_topic(name: &str) -> String {
    format!("{}/OUT/STATE", name)
}

pub fn state_payloads(open: bool) -> (&'static str, &'static str) {
    if open {
        ("OPEN", "Open")
    } else {
        ("CLOSED", "Closed")
    }
}

// ───────────────────────────────────────────────────────────────
// Notifier
// ───────────────────────────────────────────────────────────────

pub struct Notifier {
    name: String,
    webhook_key: String,
    broker_connected: bool,
    subscribed: bool,
    #[cfg(target_os = "espidf")]
    client: Option<EspMqttClient<'static>>,
    #[cfg(target_os = "espidf")]
    link_up: Arc<AtomicBool>,
    #[cfg(target_os = "espidf")]
    inbox: Arc<Mutex<Inbox>>,
    #[cfg(not(target_os = "espidf"))]
    inbox: Inbox,
    /// Simulation: every delivered `(target, payload)`.
    #[cfg(not(target_os = "espidf"))]
    pub outbox: Vec<(String, String)>,
    /// Simulation: answer for the next broker connect attempts.
    #[cfg(not(target_os = "espidf"))]
    pub sim_broker_reachable: bool,
}

impl Notifier {
    pub fn new(options: &Options) -> Self {
        let mut n = Self {
            name: String::new(),
            webhook_key: String::new(),
            broker_connected: false,
            subscribed: false,
            #[cfg(target_os = "espidf")]
            client: None,
            #[cfg(target_os = "espidf")]
            link_up: Arc::new(AtomicBool::new(false)),
            #[cfg(target_os = "espidf")]
            inbox: Arc::new(Mutex::new(Inbox::new())),
            #[cfg(not(target_os = "espidf"))]
            inbox: Inbox::new(),
            #[cfg(not(target_os = "espidf"))]
            outbox: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_broker_reachable: true,
        };
        n.configure(options);
        n
    }

    /// Pick up the device name and webhook key after an options change.
    pub fn configure(&mut self, options: &Options) {
        let name = options.str(OptionKey::Name);
        if self.name != name {
            self.name = name.to_owned();
            // Topics change with the name.
            self.subscribed = false;
        }
        let key = options.str(OptionKey::Iftt);
        if self.webhook_key != key {
            self.webhook_key = key.to_owned();
        }
    }

    fn webhook_configured(&self) -> bool {
        self.webhook_key.len() >= MIN_WEBHOOK_KEY_LEN
    }

    // ── NotifierPort side ─────────────────────────────────────

    /// Deliver to every configured target; the first failure is reported.
    pub fn notify(&mut self, text: &str) -> Result<(), NotifyError> {
        let mut delivered = false;
        let mut first_err = None;

        if self.webhook_configured() {
            match self.post_webhook(text) {
                Ok(()) => delivered = true,
                Err(e) => {
                    warn!("Webhook delivery failed: {}", e);
                    first_err.get_or_insert(e);
                }
            }
        }
        if self.broker_connected() {
            let topic = notify_topic(&self.name);
            match self.publish(&topic, text) {
                Ok(()) => delivered = true,
                Err(e) => {
                    first_err.get_or_insert(e);
                }
            }
        }

        match first_err {
            Some(e) => Err(e),
            None if delivered => Ok(()),
            None => Err(NotifyError::NotConfigured),
        }
    }

    pub fn publish_state(&mut self, open: bool) -> Result<(), NotifyError> {
        if !self.broker_connected() {
            return Err(NotifyError::Disconnected);
        }
        let (state, legacy) = state_payloads(open);
        let topic = state_topic(&self.name);
        self.publish(&topic, state)?;
        let name = self.name.clone();
        self.publish(&name, legacy)
    }

    // ── Broker session ────────────────────────────────────────

    pub fn connect_broker(&mut self, server: &str, client_id: &str) -> bool {
        self.subscribed = false;
        self.broker_connected = self.platform_connect(server, client_id);
        if self.broker_connected {
            info!("Broker: session to {}:{} as '{}'", server, BROKER_PORT, client_id);
        }
        self.broker_connected
    }

    pub fn broker_connected(&mut self) -> bool {
        #[cfg(target_os = "espidf")]
        {
            self.broker_connected = self.client.is_some() && self.link_up.load(Ordering::Relaxed);
        }
        self.broker_connected
    }

    /// Subscribe once per session to `<name>` and `<name>/IN/#`.
    pub fn keep_alive(&mut self) {
        if self.subscribed || !self.broker_connected() {
            return;
        }
        let topics = [self.name.clone(), format!("{}/IN/#", self.name)];
        for topic in &topics {
            if !self.platform_subscribe(topic) {
                warn!("Broker: subscribe to {} failed", topic);
                return;
            }
        }
        self.subscribed = true;
    }

    /// Oldest unhandled broker message.
    pub fn take_message(&mut self) -> Option<BrokerMessage> {
        #[cfg(target_os = "espidf")]
        {
            self.inbox.lock().ok()?.pop_front()
        }
        #[cfg(not(target_os = "espidf"))]
        {
            self.inbox.pop_front()
        }
    }

    /// Simulation: inject a message as if it arrived from the broker.
    #[cfg(not(target_os = "espidf"))]
    pub fn inject_message(&mut self, topic: &str, payload: &str) {
        let msg = BrokerMessage {
            topic: topic.to_owned(),
            payload: payload.to_owned(),
        };
        if self.inbox.push_back(msg).is_err() {
            warn!("Broker: inbox full, dropping message on {}", topic);
        }
    }

    /// Simulation: drop the session.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_disconnect(&mut self) {
        self.broker_connected = false;
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self, server: &str, client_id: &str) -> bool {
        self.client = None;
        self.link_up.store(false, Ordering::Relaxed);
        let url = format!("mqtt://{}:{}", server, BROKER_PORT);
        let conf = MqttClientConfiguration {
            client_id: Some(client_id),
            ..Default::default()
        };
        match EspMqttClient::new(url.as_str(), &conf) {
            Ok((client, conn)) => {
                spawn_receiver(conn, self.link_up.clone(), self.inbox.clone());
                self.client = Some(client);
                // The session comes up asynchronously; report the attempt.
                true
            }
            Err(e) => {
                warn!("Broker: client creation failed: {:?}", e);
                false
            }
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self, _server: &str, _client_id: &str) -> bool {
        self.sim_broker_reachable
    }

    #[cfg(target_os = "espidf")]
    fn platform_subscribe(&mut self, topic: &str) -> bool {
        self.client
            .as_mut()
            .is_some_and(|c| c.subscribe(topic, QoS::AtMostOnce).is_ok())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_subscribe(&mut self, _topic: &str) -> bool {
        true
    }

    #[cfg(target_os = "espidf")]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        let client = self.client.as_mut().ok_or(NotifyError::Disconnected)?;
        client
            .enqueue(topic, QoS::AtMostOnce, false, payload.as_bytes())
            .map(|_| ())
            .map_err(|_| NotifyError::Transport("broker publish"))
    }

    #[cfg(not(target_os = "espidf"))]
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        self.outbox.push((topic.to_owned(), payload.to_owned()));
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn post_webhook(&mut self, text: &str) -> Result<(), NotifyError> {
        use embedded_svc::http::client::Client;
        use embedded_svc::io::Write;
        use esp_idf_svc::http::client::{Configuration, EspHttpConnection};

        let url = format!("{}{}", WEBHOOK_BASE, self.webhook_key);
        let body = webhook_body(text);
        let conn = EspHttpConnection::new(&Configuration::default())
            .map_err(|_| NotifyError::Transport("http connection"))?;
        let mut client = Client::wrap(conn);
        let len = body.len().to_string();
        let headers = [("content-type", "application/json"), ("content-length", len.as_str())];
        let mut req = client
            .post(&url, &headers)
            .map_err(|_| NotifyError::Transport("http request"))?;
        req.write_all(body.as_bytes())
            .map_err(|_| NotifyError::Transport("http write"))?;
        let resp = req.submit().map_err(|_| NotifyError::Transport("http submit"))?;
        match resp.status() {
            200..=299 => Ok(()),
            status => Err(NotifyError::Rejected(status)),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn post_webhook(&mut self, text: &str) -> Result<(), NotifyError> {
        let url = format!("{}{}", WEBHOOK_BASE, self.webhook_key);
        self.outbox.push((url, webhook_body(text)));
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn spawn_receiver(mut conn: EspMqttConnection, link_up: Arc<AtomicBool>, inbox: Arc<Mutex<Inbox>>) {
    let spawned = std::thread::Builder::new()
        .name("mqtt-rx".into())
        .stack_size(6 * 1024)
        .spawn(move || {
            while let Ok(event) = conn.next() {
                match event.payload() {
                    EventPayload::Connected(_) => link_up.store(true, Ordering::Relaxed),
                    EventPayload::Disconnected => link_up.store(false, Ordering::Relaxed),
                    EventPayload::Received {
                        topic: Some(topic),
                        data,
                        details: Details::Complete,
                        ..
                    } if data.len() <= MAX_BROKER_PAYLOAD => {
                        let Ok(payload) = core::str::from_utf8(data) else {
                            continue;
                        };
                        let msg = BrokerMessage {
                            topic: topic.to_owned(),
                            payload: payload.to_owned(),
                        };
                        if let Ok(mut q) = inbox.lock() {
                            if q.push_back(msg).is_err() {
                                warn!("Broker: inbox full, dropping message on {}", topic);
                            }
                        }
                    }
                    _ => {}
                }
            }
            link_up.store(false, Ordering::Relaxed);
            info!("Broker: receiver finished");
        });
    if let Err(e) = spawned {
        warn!("Broker: receiver thread spawn failed: {}", e);
    }
}
