use reqwest::{Client, StatusCode};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, error, info, Instrument, Span};

use crate::panel::{ControlDescriptor, PropertyValue};

/// Receives resolved property updates.
pub trait PropertySink {
    /// Push `value` to every path of `control`. Must not block on delivery.
    fn dispatch(&self, control: &ControlDescriptor, value: PropertyValue);
}

#[derive(Debug, Serialize)]
struct ValueBody {
    value: PropertyValue,
}

/// How the simulator answered one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Applied,
    Rejected { status: StatusCode, headers: String },
}

/// Sends property updates to the simulator's HTTP property server.
///
/// Every path gets its own task on the runtime; tasks are never awaited and
/// only log their outcome.
pub struct HttpDispatcher {
    client: Client,
    base_url: String,
    runtime: Handle,
}

impl HttpDispatcher {
    pub fn new(base_url: impl Into<String>, runtime: Handle) -> Result<Self, reqwest::Error> {
        // The property server is local; environment proxies must not apply.
        let client = Client::builder().no_proxy().build()?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            runtime,
        })
    }
}

impl PropertySink for HttpDispatcher {
    fn dispatch(&self, control: &ControlDescriptor, value: PropertyValue) {
        for path in control.paths {
            let url = format!("{}{}", self.base_url, path);
            debug!(
                body = %serde_json::json!({ "value": value }),
                %url,
                "posting property update"
            );

            let client = self.client.clone();
            let task = async move {
                match post_value(&client, &url, value).await {
                    Ok(PostOutcome::Applied) => debug!(%url, status = 200, "property updated"),
                    Ok(PostOutcome::Rejected { status, headers }) => {
                        error!(%url, status = status.as_u16(), %headers, "property update rejected")
                    }
                    Err(err) => error!(%url, error = %err, "property update failed"),
                }
            };
            self.runtime.spawn(task.instrument(Span::current()));
        }

        if value.is_on() {
            info!("{} turned ON", control.name);
        } else {
            info!("{} turned OFF", control.name);
        }
    }
}

/// POST `{"value": value}` to `url`.
pub async fn post_value(
    client: &Client,
    url: &str,
    value: PropertyValue,
) -> Result<PostOutcome, reqwest::Error> {
    let response = client.post(url).json(&ValueBody { value }).send().await?;

    let status = response.status();
    if status == StatusCode::OK {
        Ok(PostOutcome::Applied)
    } else {
        Ok(PostOutcome::Rejected {
            status,
            headers: format!("{:?}", response.headers()),
        })
    }
}
