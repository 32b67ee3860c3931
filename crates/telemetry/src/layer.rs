//! `tracing` layer feeding the error forwarder.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::forwarder::{EventClient, EventFilter, ExceptionInfo, ForwardedEvent};

/// Field holding the formatted log message.
const MESSAGE_FIELD: &str = "message";
/// Field holding the error value.
const ERROR_FIELD: &str = "error";
/// Field holding the fully qualified exception type path.
const EXCEPTION_TYPE_FIELD: &str = "exception_type";
/// Exception type reported for records carrying an `error` without a type path.
const UNTYPED_EXCEPTION: &str = "Error";

/// Forwards records at or above the threshold to an [`EventClient`].
///
/// Obtain one from [`crate::Forwarder::layer`].
pub struct ForwardingLayer<C> {
    client: Arc<C>,
    filter: Arc<EventFilter>,
}

impl<C> ForwardingLayer<C> {
    pub(crate) const fn new(client: Arc<C>, filter: Arc<EventFilter>) -> Self {
        Self { client, filter }
    }
}

impl<C> Clone for ForwardingLayer<C> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            filter: Arc::clone(&self.filter),
        }
    }
}

impl<S, C> Layer<S> for ForwardingLayer<C>
where
    S: Subscriber,
    C: EventClient + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        // ERROR < WARN < INFO in `tracing` ordering
        if *metadata.level() > self.filter.threshold {
            return;
        }
        if self.filter.is_excluded_target(metadata.target()) {
            return;
        }

        let mut fields = FieldVisitor::default();
        event.record(&mut fields);

        if let Some(type_name) = &fields.exception_type
            && self.filter.is_ignored(type_name)
        {
            return;
        }

        let exception = match (fields.exception_type, fields.error) {
            (None, None) => None,
            (type_name, value) => Some(ExceptionInfo {
                type_name: type_name.unwrap_or_else(|| UNTYPED_EXCEPTION.to_string()),
                value,
            }),
        };

        self.client.capture(ForwardedEvent {
            level: *metadata.level(),
            message: fields.message,
            logger: metadata.target().to_string(),
            exception,
            extra: fields.extra,
        });
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    error: Option<String>,
    exception_type: Option<String>,
    extra: BTreeMap<String, String>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            MESSAGE_FIELD => self.message = Some(value),
            ERROR_FIELD => self.error = Some(value),
            EXCEPTION_TYPE_FIELD => self.exception_type = Some(value),
            name => {
                self.extra.insert(name.to_string(), value);
            }
        }
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        self.put(field, value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{value:?}"));
    }
}
