use crate::error::{ConfigError, ConfigErrorKind};
use crate::sort::{parse_sort, SortWhitelist};
use crate::strategy::PageDefaults;

/// Condition literal that always applies paging.
pub const ALWAYS_APPLY: &str = "";

/// Condition literal that never applies paging.
///
/// The resolved value is still published to the context, so the call target
/// can page manually.
pub const NEVER_APPLY: &str = "false";

/// How a declaration's condition gates an invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyCondition {
    /// Paging is always applied
    Always,
    /// Paging is never applied, only exposed
    Never,
    /// Paging is applied when the expression evaluates to `true`
    Expression(String),
}

impl ApplyCondition {
    fn from_text(condition: &str) -> Self {
        match condition {
            ALWAYS_APPLY => ApplyCondition::Always,
            NEVER_APPLY => ApplyCondition::Never,
            expression => ApplyCondition::Expression(expression.to_string()),
        }
    }
}

/// Immutable paging configuration of one call target.
///
/// Built once at registration time with [`PagingDeclaration::builder`] and
/// attached to a [`CallTarget`](crate::CallTarget).
///
/// # Examples
///
/// ```
/// use paging_core::PagingDeclaration;
///
/// // Page only when the query has no id, 10 rows per page by default,
/// // newest first, sorting restricted to id and name.
/// let declaration = PagingDeclaration::builder()
///     .condition("#query.id == null")
///     .default_page_size(10)
///     .default_sort("id:desc")
///     .sort_whitelist(["id", "name"])
///     .build()
///     .expect("valid declaration");
///
/// assert_eq!(declaration.default_page_num(), 1);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PagingDeclaration {
    condition: ApplyCondition,
    defaults: PageDefaults,
    default_page_num: u32,
    default_page_size: u32,
    default_sort: String,
    arg_index: Option<usize>,
    page_size_param: Option<String>,
    page_num_param: Option<String>,
    sort_param: Option<String>,
    sort_whitelist: SortWhitelist,
}

impl PagingDeclaration {
    /// Starts a declaration with the default settings.
    pub fn builder() -> PagingDeclarationBuilder {
        PagingDeclarationBuilder::default()
    }

    /// Starts a declaration whose paging is only exposed, never applied.
    pub fn manual() -> PagingDeclarationBuilder {
        PagingDeclarationBuilder::default().condition(NEVER_APPLY)
    }

    /// Returns the gating condition.
    pub fn condition(&self) -> &ApplyCondition {
        &self.condition
    }

    /// Returns the default page number.
    pub fn default_page_num(&self) -> u32 {
        self.default_page_num
    }

    /// Returns the default page size.
    pub fn default_page_size(&self) -> u32 {
        self.default_page_size
    }

    /// Returns the default sort text.
    pub fn default_sort(&self) -> &str {
        &self.default_sort
    }

    /// Returns the forced argument index, if any.
    pub fn arg_index(&self) -> Option<usize> {
        self.arg_index
    }

    /// Returns the page size field or parameter name, if any.
    pub fn page_size_param(&self) -> Option<&str> {
        self.page_size_param.as_deref()
    }

    /// Returns the page number field or parameter name, if any.
    pub fn page_num_param(&self) -> Option<&str> {
        self.page_num_param.as_deref()
    }

    /// Returns the sort field or parameter name, if any.
    pub fn sort_param(&self) -> Option<&str> {
        self.sort_param.as_deref()
    }

    /// Returns `true` when any field or parameter name is given.
    pub fn has_param_names(&self) -> bool {
        self.page_size_param.is_some() || self.page_num_param.is_some() || self.sort_param.is_some()
    }

    /// Returns the sort whitelist.
    pub fn sort_whitelist(&self) -> &SortWhitelist {
        &self.sort_whitelist
    }

    pub(crate) fn defaults(&self) -> &PageDefaults {
        &self.defaults
    }
}

/// Builder for [`PagingDeclaration`].
#[derive(Debug, Clone)]
pub struct PagingDeclarationBuilder {
    condition: String,
    default_page_num: u32,
    default_page_size: u32,
    default_sort: String,
    arg_index: Option<usize>,
    page_size_param: Option<String>,
    page_num_param: Option<String>,
    sort_param: Option<String>,
    sort_whitelist: SortWhitelist,
}

impl Default for PagingDeclarationBuilder {
    fn default() -> Self {
        Self {
            condition: ALWAYS_APPLY.to_string(),
            default_page_num: 1,
            default_page_size: 10,
            default_sort: String::new(),
            arg_index: None,
            page_size_param: None,
            page_num_param: None,
            sort_param: None,
            sort_whitelist: SortWhitelist::default(),
        }
    }
}

impl PagingDeclarationBuilder {
    /// Sets the gating condition.
    ///
    /// See [`ALWAYS_APPLY`] and [`NEVER_APPLY`] for the reserved literals.
    pub fn condition(mut self, condition: impl Into<String>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Sets the page number used when none is supplied.
    pub fn default_page_num(mut self, page_num: u32) -> Self {
        self.default_page_num = page_num;
        self
    }

    /// Sets the page size used when none is supplied.
    pub fn default_page_size(mut self, page_size: u32) -> Self {
        self.default_page_size = page_size;
        self
    }

    /// Sets the sort used when the supplied sort is blank.
    pub fn default_sort(mut self, sort: impl Into<String>) -> Self {
        self.default_sort = sort.into();
        self
    }

    /// Forces the parameter at `index` as the paging source.
    pub fn arg_index(mut self, index: usize) -> Self {
        self.arg_index = Some(index);
        self
    }

    /// Names the page size field or parameter.
    pub fn page_size_param(mut self, name: impl Into<String>) -> Self {
        self.page_size_param = non_empty(name.into());
        self
    }

    /// Names the page number field or parameter.
    pub fn page_num_param(mut self, name: impl Into<String>) -> Self {
        self.page_num_param = non_empty(name.into());
        self
    }

    /// Names the sort field or parameter.
    pub fn sort_param(mut self, name: impl Into<String>) -> Self {
        self.sort_param = non_empty(name.into());
        self
    }

    /// Restricts sorting to the given properties.
    pub fn sort_whitelist<I, S>(mut self, properties: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sort_whitelist = SortWhitelist::new(properties);
        self
    }

    /// Validates and builds the declaration.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` when a numeric default is zero or the default
    /// sort does not parse or violates the whitelist.
    pub fn build(self) -> Result<PagingDeclaration, ConfigError> {
        check_default("default_page_num", self.default_page_num)?;
        check_default("default_page_size", self.default_page_size)?;

        let invalid_sort = |e| ConfigError::declaration(ConfigErrorKind::InvalidDefaultSort(e));
        let default_conditions = parse_sort(&self.default_sort).map_err(invalid_sort)?;
        self.sort_whitelist
            .check(&default_conditions)
            .map_err(invalid_sort)?;

        Ok(PagingDeclaration {
            condition: ApplyCondition::from_text(&self.condition),
            defaults: PageDefaults::new(
                self.default_page_size,
                self.default_page_num,
                self.default_sort.clone(),
            ),
            default_page_num: self.default_page_num,
            default_page_size: self.default_page_size,
            default_sort: self.default_sort,
            arg_index: self.arg_index,
            page_size_param: self.page_size_param,
            page_num_param: self.page_num_param,
            sort_param: self.sort_param,
            sort_whitelist: self.sort_whitelist,
        })
    }
}

fn non_empty(name: String) -> Option<String> {
    if name.is_empty() {
        None
    } else {
        Some(name)
    }
}

fn check_default(name: &'static str, value: u32) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::declaration(ConfigErrorKind::InvalidDefault {
            name,
            value,
        }));
    }
    Ok(())
}
