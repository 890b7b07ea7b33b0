//! Strategy resolution.
//!
//! Decides, from a declaration and a call target's static shape, which
//! extraction strategy applies. Resolution is pure and deterministic; it is
//! run at most once per call target by the [`ResolutionCache`](crate::ResolutionCache).
//!
//! Rules, first match wins:
//!
//! 1. zero parameters: always an error
//! 2. no index, no names: first carrier parameter, else an error
//! 3. index, no names: that parameter must be a carrier
//! 4. index and names: keys of a map parameter, else checked fields of an object parameter
//! 5. names, no index: top-level parameters found by name

use crate::declaration::PagingDeclaration;
use crate::error::{ConfigError, ConfigErrorKind};
use crate::strategy::{PagingFields, PagingPositions, ResolvedStrategy};
use crate::target::CallTarget;
use crate::value::ParamType;

/// Resolves the extraction strategy for `target` under `declaration`.
///
/// # Errors
///
/// Returns a [`ConfigError`] naming the call target and the offending index
/// or name whenever the declaration cannot be satisfied. Unsatisfiable
/// declarations never degrade to [`ResolvedStrategy::NoPaging`].
///
/// # Examples
///
/// ```
/// use paging_core::{
///     resolve, CallTarget, PageRequest, PagingDeclaration, ParamType, ResolvedStrategy,
/// };
///
/// let declaration = PagingDeclaration::builder().build().unwrap();
/// let target = CallTarget::builder("UserService::page_users")
///     .param(ParamType::Map)
///     .param(ParamType::Object(PageRequest::shape()))
///     .build();
///
/// let strategy = resolve(&declaration, &target).unwrap();
/// assert!(matches!(strategy, ResolvedStrategy::ByCarrierArgument { index: 1, .. }));
/// ```
pub fn resolve(
    declaration: &PagingDeclaration,
    target: &CallTarget,
) -> Result<ResolvedStrategy, ConfigError> {
    let error = |kind| ConfigError::for_target(target.id().clone(), kind);

    if target.param_count() == 0 {
        return Err(error(ConfigErrorKind::NoParameters));
    }

    let defaults = declaration.defaults().clone();
    match (declaration.arg_index(), declaration.has_param_names()) {
        (None, false) => {
            let index = target
                .param_types()
                .position(ParamType::is_pageable)
                .ok_or_else(|| error(ConfigErrorKind::NoPagingSource))?;
            Ok(ResolvedStrategy::ByCarrierArgument { index, defaults })
        }
        (Some(index), false) => {
            let ty = param_at(target, index)?;
            if !ty.is_pageable() {
                return Err(error(ConfigErrorKind::NotACarrier {
                    index,
                    type_name: ty.name().to_string(),
                }));
            }
            Ok(ResolvedStrategy::ByCarrierArgument { index, defaults })
        }
        (Some(index), true) => {
            let ty = param_at(target, index)?;
            let fields = PagingFields {
                page_size: declaration.page_size_param().map(str::to_string),
                page_num: declaration.page_num_param().map(str::to_string),
                sort: declaration.sort_param().map(str::to_string),
            };
            if ty.is_map() {
                return Ok(ResolvedStrategy::ByMapArgument {
                    index,
                    keys: fields,
                    defaults,
                });
            }
            for field in [&fields.page_size, &fields.page_num, &fields.sort]
                .into_iter()
                .flatten()
            {
                let present = matches!(ty, ParamType::Object(shape) if shape.has_field(field));
                if !present {
                    return Err(error(ConfigErrorKind::MissingField {
                        index,
                        field: field.clone(),
                    }));
                }
            }
            Ok(ResolvedStrategy::ByArgumentFields {
                index,
                fields,
                defaults,
            })
        }
        (None, true) => {
            let names = target
                .param_names()
                .ok_or_else(|| error(ConfigErrorKind::ParameterNamesUnavailable))?;
            let position = |name: Option<&str>| -> Result<Option<usize>, ConfigError> {
                let Some(name) = name else {
                    return Ok(None);
                };
                names
                    .iter()
                    .position(|candidate| *candidate == name)
                    .map(Some)
                    .ok_or_else(|| {
                        error(ConfigErrorKind::MissingParameter {
                            name: name.to_string(),
                        })
                    })
            };
            let positions = PagingPositions {
                page_size: position(declaration.page_size_param())?,
                page_num: position(declaration.page_num_param())?,
                sort: position(declaration.sort_param())?,
            };
            Ok(ResolvedStrategy::ByNamedParameters {
                positions,
                defaults,
            })
        }
    }
}

fn param_at(target: &CallTarget, index: usize) -> Result<&ParamType, ConfigError> {
    target.param_type(index).ok_or_else(|| {
        ConfigError::for_target(
            target.id().clone(),
            ConfigErrorKind::IndexOutOfRange {
                index,
                len: target.param_count(),
            },
        )
    })
}
