//! Shared fake debugging protocol for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

use cdp_bridge_core::types::PropertyDescriptor;
use cdp_bridge_core::{CdpError, DebuggerProtocol, Result, TargetId};

#[derive(Default)]
pub struct FakeProtocol {
    urls: Mutex<HashMap<TargetId, String>>,
    properties: Mutex<HashMap<String, Vec<PropertyDescriptor>>>,
    string_conversions: Mutex<HashMap<String, Value>>,

    pub attach_calls: AtomicUsize,
    pub detach_calls: AtomicUsize,
    pub enable_runtime_calls: AtomicUsize,
    pub enable_log_calls: AtomicUsize,
    pub get_properties_calls: AtomicUsize,

    pub fail_enable_log: AtomicBool,
    pub fail_get_properties: AtomicBool,
    pub fail_call_function: AtomicBool,
    pub fail_target_url: AtomicBool,
}

impl FakeProtocol {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_url(&self, target: &TargetId, url: &str) {
        self.urls.lock().await.insert(target.clone(), url.to_string());
    }

    pub async fn set_properties(&self, object_id: &str, props: Vec<PropertyDescriptor>) {
        self.properties
            .lock()
            .await
            .insert(object_id.to_string(), props);
    }

    pub async fn set_string_conversion(&self, object_id: &str, value: Value) {
        self.string_conversions
            .lock()
            .await
            .insert(object_id.to_string(), value);
    }

    fn injected() -> CdpError {
        CdpError::InvalidResponse("injected failure".to_string())
    }
}

#[async_trait]
impl DebuggerProtocol for FakeProtocol {
    async fn attach(&self, _target: &TargetId, _protocol_version: &str) -> Result<()> {
        self.attach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn detach(&self, _target: &TargetId) -> Result<()> {
        self.detach_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn enable_runtime_events(&self, _target: &TargetId) -> Result<()> {
        self.enable_runtime_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn enable_log_events(&self, _target: &TargetId) -> Result<()> {
        self.enable_log_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_enable_log.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        Ok(())
    }

    async fn get_properties(
        &self,
        _target: &TargetId,
        object_id: &str,
    ) -> Result<Vec<PropertyDescriptor>> {
        self.get_properties_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_get_properties.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.properties
            .lock()
            .await
            .get(object_id)
            .cloned()
            .ok_or_else(|| CdpError::InvalidResponse(format!("unknown object {object_id}")))
    }

    async fn call_function_on(
        &self,
        _target: &TargetId,
        object_id: &str,
        _declaration: &str,
    ) -> Result<Value> {
        if self.fail_call_function.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        Ok(self
            .string_conversions
            .lock()
            .await
            .get(object_id)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn target_url(&self, target: &TargetId) -> Result<String> {
        if self.fail_target_url.load(Ordering::SeqCst) {
            return Err(Self::injected());
        }
        self.urls
            .lock()
            .await
            .get(target)
            .cloned()
            .ok_or_else(|| CdpError::TargetNotFound(target.to_string()))
    }
}
