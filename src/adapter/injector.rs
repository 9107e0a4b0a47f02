//! Leaf adapter that builds instances through the implementation's constructor.

use std::sync::Arc;
use std::time::Instant;

use crate::adapter::{AnyArc, ComponentAdapter, ResolutionContext};
use crate::error::{DiError, DiResult};
use crate::implementation::{Arguments, Implementation};
use crate::internal::guard;
use crate::key::Key;
use crate::lifecycle::LifecycleStrategy;
use crate::monitor::ComponentMonitor;
use crate::parameter::Parameter;

/// Constructor-injecting leaf of every adapter chain.
///
/// Produces a fresh instance on every [`get_instance`](ComponentAdapter::get_instance)
/// call; storage is the job of the behaviors wrapping it.
pub struct ConstructorInjector {
    key: Key,
    implementation: Implementation,
    parameters: Vec<Parameter>,
    lifecycle: Arc<dyn LifecycleStrategy>,
    monitor: Arc<dyn ComponentMonitor>,
}

impl ConstructorInjector {
    /// Builds the injector, inferring parameters from the declared signature
    /// when `parameters` is empty.
    pub fn new(
        key: Key,
        implementation: Implementation,
        parameters: Vec<Parameter>,
        lifecycle: Arc<dyn LifecycleStrategy>,
        monitor: Arc<dyn ComponentMonitor>,
    ) -> DiResult<Self> {
        let declared = implementation.dependencies();
        let parameters = if parameters.is_empty() {
            declared.iter().cloned().map(Parameter::Component).collect()
        } else if parameters.len() != declared.len() {
            return Err(DiError::InvalidRegistration {
                key,
                reason: format!(
                    "{} parameter(s) supplied but {} declares {} dependencies",
                    parameters.len(),
                    implementation.type_name(),
                    declared.len()
                ),
            });
        } else {
            parameters
        };

        Ok(Self {
            key,
            implementation,
            parameters,
            lifecycle,
            monitor,
        })
    }

    fn unsatisfied(&self, dependency: &Key, err: DiError) -> DiError {
        match err {
            DiError::NotFound(missing) if &missing == dependency => DiError::UnsatisfiedDependency {
                component: self.key.clone(),
                dependency: missing,
            },
            other => other,
        }
    }
}

impl ComponentAdapter for ConstructorInjector {
    fn key(&self) -> &Key {
        &self.key
    }

    fn implementation(&self) -> &Implementation {
        &self.implementation
    }

    fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    fn resolve_dependencies(&self, ctx: &mut ResolutionContext) -> DiResult<Arguments> {
        let mut values = Vec::with_capacity(self.parameters.len());
        for parameter in &self.parameters {
            let value = match parameter {
                Parameter::Component(dep) => ctx.resolve(dep).map_err(|e| self.unsatisfied(dep, e))?,
                Parameter::Constant(constant) => constant.to_instance(),
            };
            values.push(value);
        }
        Ok(Arguments::new(self.key.clone(), values))
    }

    fn get_instance(&self, ctx: &mut ResolutionContext) -> DiResult<AnyArc> {
        let start = Instant::now();
        let built = self
            .resolve_dependencies(ctx)
            .and_then(|mut args| self.implementation.construct(&mut args));

        let ty = self.implementation.implementation_type();
        match &built {
            Ok(_) => {
                let elapsed = start.elapsed();
                guard::notify("instantiated", || self.monitor.instantiated(&self.key, ty, elapsed));
            }
            Err(err) => {
                guard::notify("instantiation_failed", || {
                    self.monitor.instantiation_failed(&self.key, ty, err)
                });
            }
        }
        built
    }

    fn verify(&self, ctx: &mut ResolutionContext) -> DiResult<()> {
        for dep in self.parameters.iter().filter_map(Parameter::key) {
            ctx.verify(dep).map_err(|e| self.unsatisfied(dep, e))?;
        }
        Ok(())
    }

    fn has_lifecycle(&self) -> bool {
        self.lifecycle.has_lifecycle(self.implementation.implementation_type())
    }
}

impl std::fmt::Debug for ConstructorInjector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstructorInjector")
            .field("key", &self.key)
            .field("implementation", &self.implementation.type_name())
            .field("parameters", &self.parameters)
            .finish()
    }
}
