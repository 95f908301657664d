//! Outbound HTTP calls to actuators.
//!
//! Calls are addressed by actuator id and resolved against the configured
//! base URLs. The request runs on a detached task; its outcome is only
//! logged.

use std::collections::HashMap;
use std::time::Duration;

use triggerd_core::config::ActuatorConfig;
use triggerd_core::context::{ActuatorCall, ActuatorGateway, HttpMethod};
use triggerd_core::TriggerdError;

#[derive(Clone)]
pub struct HttpActuators {
    client: reqwest::Client,
    endpoints: HashMap<String, String>,
}

impl HttpActuators {
    pub fn new<'a>(
        actuators: impl IntoIterator<Item = (&'a String, &'a ActuatorConfig)>,
    ) -> triggerd_core::Result<Self> {
        let endpoints = actuators
            .into_iter()
            .map(|(id, cfg)| (id.clone(), cfg.base_url.trim_end_matches('/').to_string()))
            .collect();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TriggerdError::Transport(format!("cannot build HTTP client: {e}")))?;
        Ok(Self { client, endpoints })
    }

    pub fn url_for(&self, call: &ActuatorCall) -> Option<String> {
        let base = self.endpoints.get(&call.actuator_id)?;
        let path = call.path.trim_start_matches('/');
        Some(format!("{base}/{path}"))
    }
}

fn method(m: HttpMethod) -> reqwest::Method {
    match m {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}

impl ActuatorGateway for HttpActuators {
    fn call(&self, call: ActuatorCall) -> triggerd_core::Result<()> {
        let url = self
            .url_for(&call)
            .ok_or_else(|| TriggerdError::UnknownActuator(call.actuator_id.clone()))?;
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| TriggerdError::Transport(format!("no async runtime: {e}")))?;

        let mut request = self.client.request(method(call.method), &url);
        if !call.query.is_empty() {
            request = request.query(&call.query);
        }
        if let Some(body) = call.body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let actuator_id = call.actuator_id;
        let verb = call.method;
        handle.spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {
                    tracing::debug!(actuator_id = %actuator_id, %verb, url = %url, status = %resp.status(), "actuator call ok");
                }
                Ok(resp) => {
                    tracing::warn!(actuator_id = %actuator_id, %verb, url = %url, status = %resp.status(), "actuator call rejected");
                }
                Err(e) => {
                    tracing::warn!(actuator_id = %actuator_id, %verb, url = %url, error = %e, "actuator call failed");
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn gateway() -> HttpActuators {
        let mut cfg = BTreeMap::new();
        cfg.insert(
            "lcd".to_string(),
            ActuatorConfig {
                base_url: "http://192.168.1.118:3000/".into(),
            },
        );
        HttpActuators::new(&cfg).unwrap()
    }

    fn call(actuator: &str) -> ActuatorCall {
        ActuatorCall {
            actuator_id: actuator.into(),
            method: HttpMethod::Post,
            path: "/lcd/text".into(),
            query: vec![],
            body: None,
        }
    }

    #[test]
    fn builds_with_no_actuators() {
        let gateway = HttpActuators::new(&BTreeMap::<String, ActuatorConfig>::new()).unwrap();
        assert!(gateway.url_for(&call("lcd")).is_none());
    }

    #[test]
    fn url_joins_base_and_path() {
        assert_eq!(
            gateway().url_for(&call("lcd")).as_deref(),
            Some("http://192.168.1.118:3000/lcd/text")
        );
    }

    #[test]
    fn unknown_actuator_is_rejected_synchronously() {
        let err = gateway().call(call("fan")).unwrap_err();
        assert!(matches!(err, TriggerdError::UnknownActuator(id) if id == "fan"));
    }

    #[test]
    fn call_outside_runtime_is_a_transport_error() {
        let err = gateway().call(call("lcd")).unwrap_err();
        assert!(matches!(err, TriggerdError::Transport(_)));
    }
}
