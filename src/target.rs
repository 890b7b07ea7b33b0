use std::fmt;
use std::sync::Arc;

use crate::declaration::PagingDeclaration;
use crate::value::ParamType;

/// Stable identity of a call target.
///
/// Identities key the resolution cache, so each declared method must map to
/// exactly one id for the lifetime of the process. A qualified path such as
/// `"UserService::page_users"` is the conventional choice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(Arc<str>);

impl TargetId {
    /// Creates a new identity.
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(Arc::from(id.as_ref()))
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TargetId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Static view of a method that may be augmented with auto paging.
///
/// A `CallTarget` is built once at registration time and shared by every
/// invocation of the method. It carries the declared parameter list and the
/// paging declaration, if the method has one.
///
/// # Examples
///
/// ```
/// use paging_core::{CallTarget, PageRequest, PagingDeclaration, ParamType};
///
/// let target = CallTarget::builder("UserService::page_users")
///     .named_param("query", ParamType::Map)
///     .named_param("page", ParamType::Object(PageRequest::shape()))
///     .declare(PagingDeclaration::builder().build().unwrap())
///     .build();
///
/// assert_eq!(target.param_count(), 2);
/// assert_eq!(target.param_names(), Some(vec!["query", "page"]));
/// ```
#[derive(Debug, Clone)]
pub struct CallTarget {
    id: TargetId,
    params: Vec<Param>,
    declaration: Option<Arc<PagingDeclaration>>,
}

#[derive(Debug, Clone)]
struct Param {
    name: Option<String>,
    ty: ParamType,
}

impl CallTarget {
    /// Starts building a call target with the given identity.
    pub fn builder(id: impl Into<TargetId>) -> CallTargetBuilder {
        CallTargetBuilder {
            id: id.into(),
            params: Vec::new(),
            declaration: None,
        }
    }

    /// Returns the identity of this call target.
    pub fn id(&self) -> &TargetId {
        &self.id
    }

    /// Returns the number of declared parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Returns the static types of the declared parameters, in order.
    pub fn param_types(&self) -> impl Iterator<Item = &ParamType> {
        self.params.iter().map(|p| &p.ty)
    }

    /// Returns the static type of the parameter at `index`.
    pub fn param_type(&self, index: usize) -> Option<&ParamType> {
        self.params.get(index).map(|p| &p.ty)
    }

    /// Returns the declared parameter names.
    ///
    /// Names are only available when every parameter was declared with one.
    pub fn param_names(&self) -> Option<Vec<&str>> {
        self.params.iter().map(|p| p.name.as_deref()).collect()
    }

    /// Returns the paging declaration attached to this target, if any.
    pub fn declaration(&self) -> Option<&PagingDeclaration> {
        self.declaration.as_deref()
    }
}

/// Builder for [`CallTarget`].
#[derive(Debug)]
pub struct CallTargetBuilder {
    id: TargetId,
    params: Vec<Param>,
    declaration: Option<Arc<PagingDeclaration>>,
}

impl CallTargetBuilder {
    /// Appends a named parameter.
    pub fn named_param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(Param {
            name: Some(name.into()),
            ty,
        });
        self
    }

    /// Appends a parameter whose name is not known.
    ///
    /// A single unnamed parameter makes [`CallTarget::param_names`] return `None`.
    pub fn param(mut self, ty: ParamType) -> Self {
        self.params.push(Param { name: None, ty });
        self
    }

    /// Attaches a paging declaration.
    pub fn declare(mut self, declaration: impl Into<Arc<PagingDeclaration>>) -> Self {
        self.declaration = Some(declaration.into());
        self
    }

    /// Builds the call target.
    pub fn build(self) -> CallTarget {
        CallTarget {
            id: self.id,
            params: self.params,
            declaration: self.declaration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn param_names_require_every_parameter_named() {
        let named = CallTarget::builder("a")
            .named_param("offset", ParamType::Int)
            .named_param("count", ParamType::Int)
            .build();
        assert_eq!(named.param_names(), Some(vec!["offset", "count"]));

        let partial = CallTarget::builder("b")
            .named_param("offset", ParamType::Int)
            .param(ParamType::Int)
            .build();
        assert_eq!(partial.param_names(), None);
    }

    #[test]
    fn target_ids_compare_by_value() {
        assert_eq!(TargetId::new("svc::m"), TargetId::from("svc::m"));
        assert_ne!(TargetId::new("svc::m"), TargetId::new("svc::n"));
        assert_eq!(TargetId::new("svc::m").to_string(), "svc::m");
    }

    #[test]
    fn undeclared_target_has_no_declaration() {
        let target = CallTarget::builder("svc::plain").param(ParamType::Text).build();
        assert!(target.declaration().is_none());
        assert_eq!(target.param_type(0), Some(&ParamType::Text));
        assert_eq!(target.param_type(1), None);
    }
}
