//! The routing index built from a frozen registration table.
//!
//! Path resolution picks the highest-precedence matching pattern (exact,
//! then longest prefix, then extension, then default). When the same pattern
//! is mapped twice the later mapping wins.
//!
//! Interceptor chains are assembled per request from the mappings whose
//! dispatch phases include the current phase and which apply to the path or
//! the resolved unit, in mapping order.

use std::sync::Arc;

use http::StatusCode;
use indexmap::IndexMap;
use plinth_core::{DispatchType, Interceptor, Unit};
use plinth_registry::{FrozenTable, InterceptorMapping, PathSpec, ALL_UNITS};

/// The request path relative to the context path.
///
/// Inserted as a request extension by the owning context; the dispatch stage
/// matches on this path when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathInContext {
    context_path: String,
    path: String,
}

impl PathInContext {
    /// Splits `full_path` under `context_path`.
    ///
    /// Returns `None` if the path lies outside the context path.
    ///
    /// # Example
    ///
    /// ```
    /// use plinth_stages::PathInContext;
    ///
    /// let split = PathInContext::split("/shop", "/shop/cart").unwrap();
    /// assert_eq!(split.path(), "/cart");
    /// assert!(PathInContext::split("/shop", "/shopping").is_none());
    /// ```
    #[must_use]
    pub fn split(context_path: &str, full_path: &str) -> Option<Self> {
        let rest = full_path.strip_prefix(context_path)?;
        let path = if rest.is_empty() {
            "/"
        } else if rest.starts_with('/') {
            rest
        } else {
            return None;
        };
        Some(Self {
            context_path: context_path.to_string(),
            path: path.to_string(),
        })
    }

    /// Returns the context path.
    #[must_use]
    pub fn context_path(&self) -> &str {
        &self.context_path
    }

    /// Returns the path within the context.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

/// Request extension describing why the error handler was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchError {
    /// The status the request would otherwise have received.
    pub status: StatusCode,
    /// The path that could not be served.
    pub path: String,
}

/// A resolved route.
pub(crate) struct Route<'a> {
    pub(crate) unit_name: &'a str,
    pub(crate) unit: &'a Arc<dyn Unit>,
}

/// The immutable routing index read by every request.
pub(crate) struct RoutingTable {
    table: Arc<FrozenTable>,
    paths: IndexMap<PathSpec, String>,
    error_unit: Option<Arc<dyn Unit>>,
}

impl RoutingTable {
    pub(crate) fn build(table: Arc<FrozenTable>, error_unit: Option<Arc<dyn Unit>>) -> Self {
        let mut paths = IndexMap::with_capacity(table.unit_mappings().len());
        for mapping in table.unit_mappings() {
            if let Some(previous) = paths.insert(mapping.spec.clone(), mapping.unit.clone()) {
                if previous != mapping.unit {
                    tracing::warn!(
                        pattern = %mapping.spec,
                        replaced = %previous,
                        unit = %mapping.unit,
                        "Pattern mapped twice, later mapping wins"
                    );
                }
            }
        }
        Self {
            table,
            paths,
            error_unit,
        }
    }

    pub(crate) fn table(&self) -> &FrozenTable {
        &self.table
    }

    pub(crate) fn error_unit(&self) -> Option<&Arc<dyn Unit>> {
        self.error_unit.as_ref()
    }

    pub(crate) fn routes(&self) -> impl Iterator<Item = (&PathSpec, &str)> {
        self.paths.iter().map(|(spec, unit)| (spec, unit.as_str()))
    }

    pub(crate) fn resolve(&self, path: &str) -> Option<Route<'_>> {
        let (_, unit_name) = self
            .paths
            .iter()
            .filter(|(spec, _)| spec.matches(path))
            .max_by(|(a, _), (b, _)| a.precedence(b))?;
        let unit = self.table.unit(unit_name)?;
        Some(Route { unit_name, unit })
    }

    /// Interceptors for a path-matched (or error) dispatch.
    pub(crate) fn interceptors_for(
        &self,
        path: &str,
        unit: Option<&str>,
        dispatch: DispatchType,
    ) -> Vec<&dyn Interceptor> {
        self.chain_where(dispatch, |mapping| mapping.applies_to(path, unit))
    }

    /// Interceptors for a named dispatch: unit-name mappings only.
    pub(crate) fn interceptors_for_name(&self, unit: &str, dispatch: DispatchType) -> Vec<&dyn Interceptor> {
        self.chain_where(dispatch, |mapping| {
            mapping
                .unit_names
                .iter()
                .any(|name| name == ALL_UNITS || name == unit)
        })
    }

    fn chain_where<F>(&self, dispatch: DispatchType, applies: F) -> Vec<&dyn Interceptor>
    where
        F: Fn(&InterceptorMapping) -> bool,
    {
        let mut chain: Vec<&dyn Interceptor> = Vec::new();
        for mapping in self.table.interceptor_mappings() {
            if !mapping.dispatch_types.contains(dispatch) || !applies(mapping) {
                continue;
            }
            if let Some(interceptor) = self.table.interceptor(&mapping.interceptor) {
                chain.push(&**interceptor);
            }
        }
        chain
    }

    /// Initialises interceptors, then units, then the error unit.
    ///
    /// On failure everything initialised so far is destroyed again.
    pub(crate) fn init_all(&self) -> plinth_core::PlinthResult<()> {
        let interceptors: Vec<_> = self.table.interceptors().collect();
        for (index, (name, interceptor)) in interceptors.iter().enumerate() {
            if let Err(err) = interceptor.init(name) {
                tracing::error!(interceptor = %name, error = %err, "Interceptor init failed");
                for (_, done) in interceptors[..index].iter().rev() {
                    done.destroy();
                }
                return Err(err);
            }
        }

        let units: Vec<_> = self.table.units().collect();
        for (index, (name, unit)) in units.iter().enumerate() {
            if let Err(err) = unit.init(name) {
                tracing::error!(unit = %name, error = %err, "Unit init failed");
                for (_, done) in units[..index].iter().rev() {
                    done.destroy();
                }
                for (_, done) in interceptors.iter().rev() {
                    done.destroy();
                }
                return Err(err);
            }
        }

        if let Some(error_unit) = &self.error_unit {
            if let Err(err) = error_unit.init("error-handler") {
                self.destroy_registered();
                return Err(err);
            }
        }
        Ok(())
    }

    /// Destroys the error unit, then units and interceptors in reverse order.
    pub(crate) fn destroy_all(&self) {
        if let Some(error_unit) = &self.error_unit {
            error_unit.destroy();
        }
        self.destroy_registered();
    }

    fn destroy_registered(&self) {
        for (name, unit) in self.table.units().rev() {
            tracing::trace!(unit = %name, "Destroying unit");
            unit.destroy();
        }
        for (name, interceptor) in self.table.interceptors().rev() {
            tracing::trace!(interceptor = %name, "Destroying interceptor");
            interceptor.destroy();
        }
    }
}
