//! Script execution for a single virtual user iteration

use super::{InboundHandler, VirtualUser, VuContext};
use crate::client::{Connection, ConnectionEvent, EventStream, Session};
use crate::constants::CLOSE_GRACE;
use crate::message::OutboundMessage;
use crate::metrics::MetricName;

use tokio::time::timeout;
use tracing::{debug, error, warn};

impl VirtualUser {
    /// Connect, run the script while dispatching inbound events, then close.
    ///
    /// Never fails: every problem becomes a metric sample and a log line.
    pub async fn run(&self, ctx: &VuContext) {
        let Session {
            handshake,
            mut connection,
            events,
        } = ctx.connector.connect(&ctx.url).await;

        ctx.metrics
            .record(MetricName::Connected, handshake.succeeded());
        if let Some(err) = handshake.to_error() {
            warn!("VU {} ({}): {}", self.id, self.strategy, err);
        }

        let handler = InboundHandler::new(self.id, &ctx.metrics);
        let dispatch = dispatch_events(events, &handler);
        tokio::pin!(dispatch);

        let dispatch_done = {
            let script = self.drive_script(ctx, &connection);
            tokio::pin!(script);

            let mut dispatch_done = false;
            loop {
                tokio::select! {
                    _ = &mut script => break,
                    _ = &mut dispatch, if !dispatch_done => dispatch_done = true,
                }
            }
            dispatch_done
        };

        // Let the close handshake and trailing replies drain
        if !dispatch_done && timeout(CLOSE_GRACE, &mut dispatch).await.is_err() {
            debug!("VU {} close not acknowledged within {:?}", self.id, CLOSE_GRACE);
            connection.force_close();
        }
    }

    async fn drive_script(&self, ctx: &VuContext, connection: &Connection) {
        let script = &ctx.script;

        self.send(ctx, connection, OutboundMessage::create_room(self.strategy, &self.room_id))
            .await;
        ctx.pacer.pause(script.create_settle).await;

        for _ in 0..script.select_count {
            let select = OutboundMessage::select_card(
                self.strategy,
                &self.room_id,
                &self.user_id,
                &script.card_value,
            );
            self.send(ctx, connection, select).await;
            ctx.pacer.pause(script.select_interval).await;
        }

        if script.read_room {
            self.send(ctx, connection, OutboundMessage::get_room(self.strategy, &self.room_id))
                .await;
        }

        ctx.pacer.pause(script.close_delay).await;
        connection.close().await;
    }

    async fn send(&self, ctx: &VuContext, connection: &Connection, message: OutboundMessage) {
        let command = message.command();
        let text = match message.to_json() {
            Ok(text) => text,
            Err(e) => {
                error!("VU {} failed to encode {}: {}", self.id, command, e);
                return;
            }
        };

        match connection.send(text).await {
            Ok(()) => {
                ctx.metrics.record_message_sent();
                debug!("VU {} sent {} for {}", self.id, command, self.room_id);
            }
            Err(e) => {
                ctx.metrics.record_send_dropped();
                debug!("VU {} dropped {}: {}", self.id, command, e);
            }
        }
    }
}

/// Handle events until the connection reports closed or the transport is gone
async fn dispatch_events(mut events: EventStream, handler: &InboundHandler<'_>) {
    while let Some(event) = events.next().await {
        let closed = matches!(event, ConnectionEvent::Close);
        handler.handle(event);
        if closed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::FakeService;
    use crate::client::{Connector, Frame};
    use crate::common::{Strategy, VuId};
    use crate::config::ScriptConfig;
    use crate::metrics::AggregateMetrics;
    use crate::vu::{Pacer, TokioPacer};

    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::Instant;
    use url::Url;

    fn context(service: &FakeService, script: ScriptConfig) -> VuContext {
        VuContext {
            url: Url::parse("ws://localhost:8080/ws/games").unwrap(),
            script: Arc::new(script),
            metrics: Arc::new(AggregateMetrics::new()),
            connector: Arc::new(service.clone()) as Arc<dyn Connector>,
            pacer: Arc::new(TokioPacer),
        }
    }

    fn parse(text: &str) -> serde_json::Value {
        serde_json::from_str(text).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_script_order_and_pacing() {
        let service = FakeService::new();
        let ctx = context(&service, ScriptConfig::default());
        let vu = VirtualUser::new(VuId(0), Strategy::Global);

        let start = Instant::now();
        vu.run(&ctx).await;

        let texts = service.texts(0);
        assert_eq!(texts.len(), 11);

        let create = parse(&texts[0].1);
        assert_eq!(create["command"], "CREATE_ROOM");
        assert_eq!(create["strategy"], "global");
        assert_eq!(create["roomId"], vu.room_id.as_str());
        assert_eq!(texts[0].0, start);

        for (at, text) in &texts[1..] {
            let select = parse(text);
            assert_eq!(select["command"], "SELECT_CARD");
            assert_eq!(select["roomId"], vu.room_id.as_str());
            assert_eq!(select["userId"], vu.user_id.as_str());
            assert_eq!(select["cardValue"], "Ace");
            assert!(*at >= start + Duration::from_secs(3));
        }
        assert_eq!(texts[1].0, start + Duration::from_secs(3));
        for pair in texts[1..].windows(2) {
            assert_eq!(pair[1].0 - pair[0].0, Duration::from_millis(100));
        }

        let close = service
            .received()
            .into_iter()
            .find(|r| r.frame == Frame::Close)
            .unwrap();
        assert_eq!(close.at, start + Duration::from_secs(9));
        assert_eq!(service.clean_closes(), 1);
        assert_eq!(service.live_connections(), 0);

        assert_eq!(ctx.metrics.rate(MetricName::Connected), Some(1.0));
        assert_eq!(ctx.metrics.sample(MetricName::RoomCreated).positive, 1);
        assert_eq!(ctx.metrics.sample(MetricName::CardSelected).positive, 10);
        assert_eq!(ctx.metrics.rate(MetricName::Error), None);

        let counters = ctx.metrics.counters();
        assert_eq!(counters.messages_sent, 11);
        assert_eq!(counters.messages_received, 11);
        assert_eq!(counters.sessions_opened, 1);
        assert_eq!(counters.sends_dropped, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_room_sends_get_room_last() {
        let service = FakeService::new();
        let script = ScriptConfig {
            read_room: true,
            ..ScriptConfig::default()
        };
        let ctx = context(&service, script);
        let vu = VirtualUser::new(VuId(1), Strategy::Rdbms);

        vu.run(&ctx).await;

        let texts = service.texts(0);
        assert_eq!(texts.len(), 12);
        let read = parse(&texts[11].1);
        assert_eq!(read["command"], "GET_ROOM");
        assert_eq!(read["roomId"], vu.room_id.as_str());
        assert_eq!(ctx.metrics.sample(MetricName::RoomRead).positive, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_room_shaped_greeting_counts_as_read() {
        let service = FakeService::new()
            .silent()
            .with_greeting(&[r#"{"roomId":"room-abcde"}"#]);
        let ctx = context(&service, ScriptConfig::default());

        VirtualUser::new(VuId(2), Strategy::Local).run(&ctx).await;

        assert_eq!(ctx.metrics.sample(MetricName::RoomRead).positive, 1);
        assert_eq!(ctx.metrics.rate(MetricName::RoomCreated), None);
        assert_eq!(ctx.metrics.rate(MetricName::Error), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_greetings_do_not_stop_script() {
        let service = FakeService::new()
            .silent()
            .with_greeting(&[r#"{"error":"room not found"}"#, "not-json"]);
        let ctx = context(&service, ScriptConfig::default());

        VirtualUser::new(VuId(3), Strategy::Rdbms).run(&ctx).await;

        assert_eq!(ctx.metrics.sample(MetricName::Error).positive, 2);
        assert_eq!(service.texts(0).len(), 11);
        assert_eq!(service.clean_closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_handshake_drops_sends() {
        let service = FakeService::new().with_status(500);
        let ctx = context(&service, ScriptConfig::default());

        let start = Instant::now();
        VirtualUser::new(VuId(4), Strategy::Global).run(&ctx).await;

        assert_eq!(ctx.metrics.rate(MetricName::Connected), Some(0.0));
        assert_eq!(ctx.metrics.rate(MetricName::Error), None);
        assert!(service.received().is_empty());

        let counters = ctx.metrics.counters();
        assert_eq!(counters.messages_sent, 0);
        assert_eq!(counters.sends_dropped, 11);
        assert_eq!(counters.sessions_opened, 0);
        // The script still paces through its pauses
        assert_eq!(start.elapsed(), Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_close_skips_close_grace() {
        let service = FakeService::new().closes_first();
        let ctx = context(&service, ScriptConfig::default());

        let start = Instant::now();
        VirtualUser::new(VuId(6), Strategy::Rdbms).run(&ctx).await;

        // Script pauses only, no wait for a close acknowledgement
        assert_eq!(start.elapsed(), Duration::from_secs(9));
        assert!(service.received().is_empty());
        assert_eq!(ctx.metrics.rate(MetricName::Connected), Some(1.0));
        assert_eq!(ctx.metrics.rate(MetricName::Error), None);

        let counters = ctx.metrics.counters();
        assert_eq!(counters.sessions_opened, 1);
        assert_eq!(counters.messages_sent, 0);
        assert_eq!(counters.sends_dropped, 11);
    }

    #[derive(Default)]
    struct RecordingPacer {
        pauses: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Pacer for RecordingPacer {
        async fn pause(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }

    #[tokio::test]
    async fn test_script_pauses_through_pacer() {
        let service = FakeService::new();
        let pacer = Arc::new(RecordingPacer::default());
        let mut ctx = context(&service, ScriptConfig::default());
        ctx.pacer = pacer.clone();

        VirtualUser::new(VuId(5), Strategy::Local).run(&ctx).await;

        let pauses = pacer.pauses.lock().unwrap().clone();
        let mut expected = vec![Duration::from_secs(3)];
        expected.extend(std::iter::repeat_n(Duration::from_millis(100), 10));
        expected.push(Duration::from_secs(5));
        assert_eq!(pauses, expected);
        assert_eq!(service.texts(0).len(), 11);
    }
}
