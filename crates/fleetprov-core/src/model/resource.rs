// ── Resource descriptors ──
//
// One uniform shape for every resource in the graph. Whether the platform
// models a resource declaratively or it has to be driven through raw API
// calls, the engine sees the same create/update/delete triple.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::param::{FieldPath, ParamValue};

/// How the platform exposes a resource. Informational only; the engine
/// drives both kinds through the same lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    /// Covered by the platform's declarative resource model.
    Native,
    /// Only reachable through imperative API calls.
    Custom,
}

/// Status of a status-tracked resource (manifests).
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    Draft,
    Active,
    Invalid,
}

/// A single remote action with its (possibly bound) parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionSpec {
    pub service: String,
    pub action: String,
    pub parameters: ParamValue,
}

impl ActionSpec {
    pub fn new(service: &str, action: &str, parameters: ParamValue) -> Self {
        Self {
            service: service.to_owned(),
            action: action.to_owned(),
            parameters,
        }
    }

    /// `service:action`
    pub fn label(&self) -> String {
        format!("{}:{}", self.service, self.action)
    }
}

/// Where the physical identifier of a created resource comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhysicalId {
    /// Known up front (thing name, manifest name).
    Fixed(String),
    /// Assigned by the platform and read from the creation response.
    Field(FieldPath),
}

/// Precondition checked right before a resource's remote call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The call moves `target` to status `to`. `target` must already be
    /// recorded as created; its status is updated on success.
    Transition { target: String, to: LifecycleStatus },
    /// `target` must be recorded with exactly `status`.
    RequiresStatus {
        target: String,
        status: LifecycleStatus,
    },
}

impl Guard {
    pub fn target(&self) -> &str {
        match self {
            Self::Transition { target, .. } | Self::RequiresStatus { target, .. } => target,
        }
    }
}

/// Desired state of one resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    /// Logical name, stable across runs.
    pub name: String,
    pub kind: ResourceKind,
    pub create: ActionSpec,
    /// In-place update path. Without one, changed parameters require
    /// replacement.
    pub update: Option<ActionSpec>,
    /// Teardown action. Its parameters may bind to this resource's own
    /// creation response.
    pub delete: Option<ActionSpec>,
    /// Calls that must succeed before `delete`, in order (e.g. deactivating
    /// a certificate the platform refuses to delete while active).
    pub pre_delete: Vec<ActionSpec>,
    /// Explicit ordering edges. Binding-implied edges are added by the
    /// graph builder.
    pub depends_on: Vec<String>,
    pub physical_id: PhysicalId,
    /// Response fields that must never be persisted or printed.
    pub sensitive_fields: Vec<FieldPath>,
    /// Status recorded on creation, for status-tracked resources.
    pub initial_status: Option<LifecycleStatus>,
    pub guards: Vec<Guard>,
}

impl ResourceDescriptor {
    pub fn new(name: &str, kind: ResourceKind, create: ActionSpec) -> Self {
        Self {
            name: name.to_owned(),
            kind,
            create,
            update: None,
            delete: None,
            pre_delete: Vec::new(),
            depends_on: Vec::new(),
            physical_id: PhysicalId::Fixed(name.to_owned()),
            sensitive_fields: Vec::new(),
            initial_status: None,
            guards: Vec::new(),
        }
    }

    pub fn native(name: &str, create: ActionSpec) -> Self {
        Self::new(name, ResourceKind::Native, create)
    }

    pub fn custom(name: &str, create: ActionSpec) -> Self {
        Self::new(name, ResourceKind::Custom, create)
    }

    // ── Builder methods ──────────────────────────────────────────────

    pub fn with_update(mut self, update: ActionSpec) -> Self {
        self.update = Some(update);
        self
    }

    pub fn with_delete(mut self, delete: ActionSpec) -> Self {
        self.delete = Some(delete);
        self
    }

    /// Run `step` during teardown, before the delete action.
    pub fn before_delete(mut self, step: ActionSpec) -> Self {
        self.pre_delete.push(step);
        self
    }

    /// Every teardown call in execution order.
    pub fn teardown(&self) -> impl Iterator<Item = &ActionSpec> {
        self.pre_delete.iter().chain(self.delete.as_ref())
    }

    /// Add an ordering edge: this resource runs after `dependency`.
    pub fn after(mut self, dependency: &str) -> Self {
        if !self.depends_on.iter().any(|d| d == dependency) {
            self.depends_on.push(dependency.to_owned());
        }
        self
    }

    pub fn with_physical_id(mut self, id: PhysicalId) -> Self {
        self.physical_id = id;
        self
    }

    pub fn sensitive(mut self, field: &str) -> Self {
        self.sensitive_fields.push(FieldPath::new(field));
        self
    }

    pub fn with_initial_status(mut self, status: LifecycleStatus) -> Self {
        self.initial_status = Some(status);
        self
    }

    pub fn with_guard(mut self, guard: Guard) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn is_sensitive(&self, field: &FieldPath) -> bool {
        self.sensitive_fields.contains(field)
    }
}

/// Anything that can describe its own desired state as a resource.
pub trait ResourceSpec {
    fn describe(&self) -> ResourceDescriptor;
}

impl ResourceSpec for ResourceDescriptor {
    fn describe(&self) -> ResourceDescriptor {
        self.clone()
    }
}
