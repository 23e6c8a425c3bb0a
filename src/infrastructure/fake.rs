//! Scripted platform for exercising the upgrade state machine in tests.
//!
//! Every reload of a target pops the next scripted [`Step`]; once the
//! script is down to its last step that step repeats forever. Each call
//! is recorded as `"<call>:<id>"` so tests can count round-trips.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{Service, ServiceUpgrade, Stack, StackUpgrade, TemplateVersion, Transitioning};
use crate::error::PlatformError;
use crate::infrastructure::platform::{Catalog, Platform};

#[derive(Debug, Clone)]
pub struct Step {
    pub transitioning: Transitioning,
    pub state: String,
    pub message: String,
}

impl Step {
    pub fn pending() -> Self {
        Self {
            transitioning: Transitioning::Pending,
            state: "upgrading".to_string(),
            message: String::new(),
        }
    }

    pub fn settled(state: &str) -> Self {
        Self {
            transitioning: Transitioning::Settled,
            state: state.to_string(),
            message: String::new(),
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            transitioning: Transitioning::Error,
            state: "upgrading".to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Default)]
pub struct FakePlatform {
    services: Vec<Service>,
    stacks: Vec<Stack>,
    templates: HashMap<String, TemplateVersion>,
    project_id: Option<String>,
    failing: HashSet<String>,
    scripts: Mutex<HashMap<String, VecDeque<Step>>>,
    calls: Mutex<Vec<String>>,
    inputs: Mutex<Vec<(String, Value)>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_service(mut self, service: Value) -> Self {
        self.services
            .push(serde_json::from_value(service).expect("valid service fixture"));
        self
    }

    pub fn with_stack(mut self, stack: Value) -> Self {
        self.stacks
            .push(serde_json::from_value(stack).expect("valid stack fixture"));
        self
    }

    pub fn with_template(mut self, id: &str, template: Value) -> Self {
        self.templates.insert(
            id.to_string(),
            serde_json::from_value(template).expect("valid template fixture"),
        );
        self
    }

    pub fn with_project(mut self, project_id: &str) -> Self {
        self.project_id = Some(project_id.to_string());
        self
    }

    /// Make `call` (e.g. `"upgrade:1s1"`) fail with a 500
    pub fn failing(mut self, call: &str) -> Self {
        self.failing.insert(call.to_string());
        self
    }

    pub fn script(self, id: &str, steps: Vec<Step>) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .insert(id.to_string(), steps.into());
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    /// Upgrade inputs sent so far, keyed by target id
    pub fn inputs(&self) -> Vec<(String, Value)> {
        self.inputs.lock().unwrap().clone()
    }

    fn record(&self, call: &str, id: &str) -> Result<(), PlatformError> {
        let key = format!("{}:{}", call, id);
        self.calls.lock().unwrap().push(key.clone());
        if self.failing.contains(&key) {
            return Err(PlatformError::Status {
                url: format!("fake://{}", key),
                status: 500,
                body: format!("{} refused", key),
            });
        }
        Ok(())
    }

    fn next_step(&self, id: &str) -> Step {
        let mut scripts = self.scripts.lock().unwrap();
        let Some(script) = scripts.get_mut(id) else {
            return Step::settled("upgraded");
        };
        if script.len() > 1 {
            script.pop_front().expect("non-empty script")
        } else {
            script.front().cloned().unwrap_or_else(|| Step::settled("upgraded"))
        }
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn list_services(&self) -> Result<Vec<Service>, PlatformError> {
        self.record("list", "services")?;
        Ok(self.services.clone())
    }

    async fn list_stacks(&self) -> Result<Vec<Stack>, PlatformError> {
        self.record("list", "stacks")?;
        Ok(self.stacks.clone())
    }

    async fn reload_service(&self, service: &Service) -> Result<Service, PlatformError> {
        self.record("reload", &service.id)?;
        let step = self.next_step(&service.id);
        let mut service = service.clone();
        service.transitioning = step.transitioning;
        service.state = step.state;
        service.transitioning_message = step.message;
        Ok(service)
    }

    async fn reload_stack(&self, stack: &Stack) -> Result<Stack, PlatformError> {
        self.record("reload", &stack.id)?;
        let step = self.next_step(&stack.id);
        let mut stack = stack.clone();
        stack.transitioning = step.transitioning;
        stack.state = step.state;
        stack.transitioning_message = step.message;
        Ok(stack)
    }

    async fn upgrade_service(
        &self,
        service: &Service,
        input: &ServiceUpgrade,
    ) -> Result<Service, PlatformError> {
        self.record("upgrade", &service.id)?;
        self.inputs.lock().unwrap().push((
            service.id.clone(),
            serde_json::to_value(input).expect("serializable input"),
        ));
        let mut service = service.clone();
        service.state = "upgrading".to_string();
        service.transitioning = Transitioning::Pending;
        Ok(service)
    }

    async fn finish_upgrade_service(&self, service: &Service) -> Result<Service, PlatformError> {
        self.record("finish", &service.id)?;
        let mut service = service.clone();
        service.state = "active".to_string();
        Ok(service)
    }

    async fn upgrade_stack(
        &self,
        stack: &Stack,
        input: &StackUpgrade,
    ) -> Result<Stack, PlatformError> {
        self.record("upgrade", &stack.id)?;
        self.inputs.lock().unwrap().push((
            stack.id.clone(),
            serde_json::to_value(input).expect("serializable input"),
        ));
        let mut stack = stack.clone();
        stack.state = "upgrading".to_string();
        stack.transitioning = Transitioning::Pending;
        Ok(stack)
    }

    async fn finish_upgrade_stack(&self, stack: &Stack) -> Result<Stack, PlatformError> {
        self.record("finish", &stack.id)?;
        let mut stack = stack.clone();
        stack.state = "active".to_string();
        Ok(stack)
    }
}

#[async_trait]
impl Catalog for FakePlatform {
    async fn project_id(&self) -> Result<String, PlatformError> {
        self.record("identity", "self")?;
        self.project_id.clone().ok_or_else(|| PlatformError::Forbidden {
            url: "fake://identity".to_string(),
        })
    }

    async fn refresh_templates(&self, project_id: &str) -> Result<(), PlatformError> {
        self.record("refresh", project_id)
    }

    async fn template_version(
        &self,
        _project_id: &str,
        external_id: &str,
    ) -> Result<TemplateVersion, PlatformError> {
        let id = crate::domain::template::trim_external_id(external_id);
        self.record("template", id)?;
        self.templates
            .get(id)
            .cloned()
            .ok_or_else(|| PlatformError::NotFound {
                kind: "template".to_string(),
                name: id.to_string(),
            })
    }
}
