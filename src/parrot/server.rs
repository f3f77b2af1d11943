//! MQTT server loop.
//!
//! One task owns the codec and the reaction engine. Inbound publishes, the
//! periodic node-info announcer, and shutdown are serialized through a single
//! `select!` loop, so reaction state needs no locking. Replies are paced on
//! spawned tasks; the loop itself never sleeps and keeps deduplicating
//! inbound traffic while a reply is waiting to go out.

use anyhow::{Context, Result};
use log::{debug, info, warn};
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tokio::time::{interval_at, sleep, Instant as TokioInstant, MissedTickBehavior};

use crate::config::Config;
use crate::mesh::{identity, Channel, Codec, Identity, MeshError, BROADCAST_ID};
use crate::parrot::engine::{ParrotEngine, Reply};

/// The running parrot: MQTT connection, packet codec, and reaction engine.
pub struct ParrotServer {
    config: Config,
    codec: Codec,
    engine: ParrotEngine,
    client: AsyncClient,
    eventloop: EventLoop,
}

impl ParrotServer {
    /// Build the server from configuration. Fails fast on an invalid channel
    /// key or node id; per-packet problems later are never fatal.
    pub fn new(config: Config) -> Result<Self> {
        let node_number = identity::parse_node_id(&config.node.node_id)
            .with_context(|| format!("invalid node.node_id {:?}", config.node.node_id))?;
        let identity = Identity {
            node_number,
            long_name: config.node.long_name.clone(),
            short_name: config.node.short_name.clone(),
            hw_model: config.node.hw_model.clone(),
        };
        let channel = Channel::new(config.channel.name.clone(), config.channel.key.clone());
        let codec = Codec::new(channel, identity.clone())
            .context("channel key rejected at startup")?;

        let engine = ParrotEngine::new(
            node_number,
            Duration::from_secs(config.parrot.reply_delay_seconds),
            Duration::from_secs(config.parrot.dedup_ttl_seconds),
        );

        let mut options = MqttOptions::new(
            identity.node_id(),
            config.mqtt.broker.clone(),
            config.mqtt.port,
        );
        options.set_credentials(config.mqtt.username.clone(), config.mqtt.password.clone());
        options.set_keep_alive(Duration::from_secs(30));
        let (client, eventloop) = AsyncClient::new(options, 64);

        info!("parrot node id: {}", identity.node_id());
        Ok(Self {
            config,
            codec,
            engine,
            client,
            eventloop,
        })
    }

    /// Topic carrying every envelope on the channel: `<root><channel>/#`.
    pub fn subscribe_topic(&self) -> String {
        format!(
            "{}{}/#",
            self.config.mqtt.root_topic, self.config.channel.name
        )
    }

    /// Topic this gateway publishes on: `<root><channel>/<node_id>`.
    pub fn publish_topic(&self) -> String {
        format!(
            "{}{}/{}",
            self.config.mqtt.root_topic,
            self.config.channel.name,
            self.codec.identity().node_id()
        )
    }

    /// Run until ctrl-c. The rumqttc event loop reconnects on its own; we
    /// just pace the retry after a connection error.
    pub async fn run(mut self) -> Result<()> {
        let period = Duration::from_secs(self.config.parrot.nodeinfo_interval_seconds.max(1));
        // First periodic announce one full period out; the ConnAck handler
        // covers the initial one (and every reconnect).
        let mut announce = interval_at(TokioInstant::now() + period, period);
        announce.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            "connecting to {}:{} (topic {})",
            self.config.mqtt.broker,
            self.config.mqtt.port,
            self.subscribe_topic()
        );

        loop {
            tokio::select! {
                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("connected to {}", self.config.mqtt.broker);
                        if let Err(e) = self
                            .client
                            .subscribe(self.subscribe_topic(), QoS::AtMostOnce)
                            .await
                        {
                            warn!("subscribe failed: {e}");
                        }
                        self.announce_node_info().await;
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        self.handle_publish(&publish.payload);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!("mqtt connection error: {e}; retrying in 5s");
                        if reconnect_pause(Duration::from_secs(5)).await {
                            info!("shutdown requested");
                            break;
                        }
                    }
                },
                _ = announce.tick() => {
                    self.announce_node_info().await;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("shutdown requested");
                    break;
                }
            }
        }
        Ok(())
    }

    /// Decode one transport frame and feed it to the engine. Every error
    /// here is an expected skip; the loop must survive arbitrary bytes.
    fn handle_publish(&mut self, payload: &[u8]) {
        match self.codec.decode(payload) {
            Ok((packet, data)) => {
                if let Some(reply) = self
                    .engine
                    .on_message(&packet, &data, std::time::Instant::now())
                {
                    self.send_paced_reply(reply);
                }
            }
            Err(MeshError::NotDecodable) => {
                debug!("frame not decodable on this channel, skipping");
            }
            Err(e) => {
                debug!("dropping frame: {e}");
            }
        }
    }

    /// Encode a reply now (fresh packet id) and publish it after the pacing
    /// delay on a spawned task, keeping the dispatch loop free to ingest.
    fn send_paced_reply(&self, reply: Reply) {
        let bytes = match self.codec.encode_bytes(reply.to, Codec::text_data(&reply.text)) {
            Ok(b) => b,
            Err(e) => {
                warn!("failed to encode reply: {e}");
                return;
            }
        };
        let client = self.client.clone();
        let topic = self.publish_topic();
        let delay = self.engine.reply_delay();
        tokio::spawn(async move {
            sleep(delay).await;
            if let Err(e) = client.publish(topic, QoS::AtMostOnce, false, bytes).await {
                // No retry, no queue: a lost reply is just a lost reply.
                warn!("failed to publish reply: {e}");
            }
        });
    }

    /// Broadcast our node info. Not subject to the reply throttle; the
    /// announcer runs on its own schedule.
    async fn announce_node_info(&self) {
        let data = self.codec.node_info_data();
        match self.codec.encode_bytes(BROADCAST_ID, data) {
            Ok(bytes) => {
                if let Err(e) = self
                    .client
                    .publish(self.publish_topic(), QoS::AtMostOnce, false, bytes)
                    .await
                {
                    warn!("failed to publish node info: {e}");
                } else {
                    debug!("announced node info on {}", self.publish_topic());
                }
            }
            Err(e) => warn!("failed to encode node info: {e}"),
        }
    }
}

/// Wait out the retry pause after a connection error, still listening for
/// shutdown. Returns `true` if ctrl-c arrived while the connection was down.
async fn reconnect_pause(delay: Duration) -> bool {
    tokio::select! {
        _ = sleep(delay) => false,
        _ = tokio::signal::ctrl_c() => true,
    }
}
