// Licensed under the Apache-2.0 license

use crate::dependency::{DependencyCheck, FwDependency};
use crate::error::PayloadHeaderError;
use crate::header::FmpPayloadHeader;
use log::{error, info, warn};
use uuid::Uuid;

/// Firmware currently installed for one component, as reported by a [`ComponentRegistry`].
pub trait InstalledComponent {
    fn version(&self) -> u32;
}

/// The set of firmware components present in the system.
///
/// A lookup result is held only while a single dependency is evaluated and is dropped
/// before the next lookup, on every path out of the verifier. Implementations that hand
/// out resources (descriptor buffers, handles) release them in `Drop`.
pub trait ComponentRegistry {
    type Component: InstalledComponent;

    /// Finds the component with `component_id` and `image_index`, or `None` when it is
    /// absent or cannot be queried.
    fn lookup(&self, component_id: &Uuid, image_index: u8) -> Option<Self::Component>;
}

impl<R: ComponentRegistry + ?Sized> ComponentRegistry for &R {
    type Component = R::Component;

    fn lookup(&self, component_id: &Uuid, image_index: u8) -> Option<Self::Component> {
        (**self).lookup(component_id, image_index)
    }
}

/// Diagnostics emitted while dependencies are verified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyEvent {
    DependencyBytes(usize),
    InvalidDependencyListSize(usize),
    Processing(usize),
    ComponentMissing {
        component_id: Uuid,
        image_index: u8,
        required: bool,
    },
    VersionTooLow {
        component_id: Uuid,
        installed: u32,
        required: u32,
    },
    VersionNotExact {
        component_id: Uuid,
        installed: u32,
        required: u32,
    },
    UnknownFlags {
        component_id: Uuid,
        flags: u16,
    },
    Passed {
        component_id: Uuid,
        installed: u32,
        required: u32,
    },
}

pub trait VerifyObserver {
    fn on_event(&mut self, event: &VerifyEvent);
}

impl<F: FnMut(&VerifyEvent)> VerifyObserver for F {
    fn on_event(&mut self, event: &VerifyEvent) {
        self(event)
    }
}

/// Forwards verifier events to the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl VerifyObserver for LogObserver {
    fn on_event(&mut self, event: &VerifyEvent) {
        match *event {
            VerifyEvent::DependencyBytes(bytes) => {
                info!("FmpPayload: {} dependency bytes", bytes)
            }
            VerifyEvent::InvalidDependencyListSize(bytes) => {
                error!("FmpPayload: dependency section of header is invalid size {}", bytes)
            }
            VerifyEvent::Processing(count) => {
                info!("FmpPayload: processing {} dependencies", count)
            }
            VerifyEvent::ComponentMissing {
                component_id,
                image_index,
                required: true,
            } => error!(
                "FmpPayload: required dependency {} (image index {}) not found, can not do capsule update",
                component_id, image_index
            ),
            VerifyEvent::ComponentMissing {
                component_id,
                image_index,
                required: false,
            } => warn!(
                "FmpPayload: optional dependency {} (image index {}) not found, skipping",
                component_id, image_index
            ),
            VerifyEvent::VersionTooLow {
                component_id,
                installed,
                required,
            } => error!(
                "FmpPayload: dependency for {} failed, version on system (0x{:X}) is older than required (0x{:X})",
                component_id, installed, required
            ),
            VerifyEvent::VersionNotExact {
                component_id,
                installed,
                required,
            } => error!(
                "FmpPayload: dependency for {} failed, version on system (0x{:X}) is not the exact required (0x{:X})",
                component_id, installed, required
            ),
            VerifyEvent::UnknownFlags {
                component_id,
                flags,
            } => warn!(
                "FmpPayload: unknown dependency flags for {}, flags provided 0x{:X}",
                component_id, flags
            ),
            VerifyEvent::Passed {
                component_id,
                installed,
                required,
            } => info!(
                "FmpPayload: dependency for {} passed, version on system (0x{:X}) meets required (0x{:X})",
                component_id, installed, required
            ),
        }
    }
}

/// Checks every dependency in the payload header against the firmware in `registry`.
///
/// Returns `Ok(true)` when all dependencies are met and `Ok(false)` at the first one that
/// is not. A malformed header is an error and is never verified. Diagnostics go to the
/// `log` facade.
pub fn verify_dependencies<R: ComponentRegistry>(
    payload: &[u8],
    registry: &R,
) -> Result<bool, PayloadHeaderError> {
    verify_dependencies_with_observer(payload, registry, &mut LogObserver)
}

/// Same as [`verify_dependencies`], reporting diagnostics to `observer`.
pub fn verify_dependencies_with_observer<R, O>(
    payload: &[u8],
    registry: &R,
    observer: &mut O,
) -> Result<bool, PayloadHeaderError>
where
    R: ComponentRegistry,
    O: VerifyObserver + ?Sized,
{
    FmpPayloadHeader::parse(payload)?.verify_dependencies(registry, observer)
}

impl FmpPayloadHeader<'_> {
    pub fn verify_dependencies<R, O>(
        &self,
        registry: &R,
        observer: &mut O,
    ) -> Result<bool, PayloadHeaderError>
    where
        R: ComponentRegistry,
        O: VerifyObserver + ?Sized,
    {
        let dependency_bytes = self.dependency_bytes().len();
        observer.on_event(&VerifyEvent::DependencyBytes(dependency_bytes));
        if dependency_bytes == 0 {
            return Ok(true);
        }

        let dependencies = match self.dependencies() {
            Ok(dependencies) => dependencies,
            Err(e) => {
                observer.on_event(&VerifyEvent::InvalidDependencyListSize(dependency_bytes));
                return Err(e);
            }
        };
        observer.on_event(&VerifyEvent::Processing(dependencies.len()));

        Ok(dependencies
            .iter()
            .all(|dependency| check_dependency(dependency, registry, observer)))
    }
}

/// Evaluates one dependency. The lookup result lives only for the duration of this call.
fn check_dependency<R, O>(dependency: &FwDependency, registry: &R, observer: &mut O) -> bool
where
    R: ComponentRegistry,
    O: VerifyObserver + ?Sized,
{
    let component_id = dependency.component_id();
    let required = dependency.required_version();

    let Some(component) = registry.lookup(&component_id, dependency.image_index) else {
        observer.on_event(&VerifyEvent::ComponentMissing {
            component_id,
            image_index: dependency.image_index,
            required: dependency.is_required(),
        });
        return !dependency.is_required();
    };
    let installed = component.version();

    match dependency.evaluate(installed) {
        DependencyCheck::VersionTooLow => {
            observer.on_event(&VerifyEvent::VersionTooLow {
                component_id,
                installed,
                required,
            });
            false
        }
        DependencyCheck::VersionNotExact => {
            observer.on_event(&VerifyEvent::VersionNotExact {
                component_id,
                installed,
                required,
            });
            false
        }
        DependencyCheck::Satisfied => {
            let unknown = dependency.unknown_flags();
            if unknown != 0 {
                observer.on_event(&VerifyEvent::UnknownFlags {
                    component_id,
                    flags: dependency.flags().bits(),
                });
            }
            observer.on_event(&VerifyEvent::Passed {
                component_id,
                installed,
                required,
            });
            true
        }
    }
}
