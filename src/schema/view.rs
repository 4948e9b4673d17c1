//! View builder.

use crate::sql::builder::QueryBuilder;
use crate::sql::value::Operand;

/// `with [local|cascaded] check option`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOption {
    Default,
    Local,
    Cascaded,
}

impl CheckOption {
    pub(crate) fn clause(&self) -> &'static str {
        match self {
            CheckOption::Default => "with check option",
            CheckOption::Local => "with local check option",
            CheckOption::Cascaded => "with cascaded check option",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ViewAlteration {
    RenameColumn { from: String, to: String },
    DefaultTo { column: String, value: Operand },
}

#[derive(Debug, Clone)]
pub struct ViewBuilder {
    pub(crate) name: String,
    pub(crate) schema: Option<String>,
    pub(crate) columns: Vec<String>,
    pub(crate) query: Option<QueryBuilder>,
    pub(crate) check: Option<CheckOption>,
    pub(crate) alterations: Vec<ViewAlteration>,
}

impl ViewBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            schema: None,
            columns: Vec::new(),
            query: None,
            check: None,
            alterations: Vec::new(),
        }
    }

    pub(crate) fn with_schema(mut self, schema: Option<String>) -> Self {
        self.schema = schema;
        self
    }

    /// Column names given to the view's output.
    pub fn columns<S: Into<String>>(&mut self, columns: impl IntoIterator<Item = S>) -> &mut Self {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// The select the view is defined by. Bindings are inlined as literals.
    pub fn as_query(&mut self, query: QueryBuilder) -> &mut Self {
        self.query = Some(query);
        self
    }

    pub fn check_option(&mut self) -> &mut Self {
        self.check = Some(CheckOption::Default);
        self
    }

    pub fn local_check_option(&mut self) -> &mut Self {
        self.check = Some(CheckOption::Local);
        self
    }

    pub fn cascaded_check_option(&mut self) -> &mut Self {
        self.check = Some(CheckOption::Cascaded);
        self
    }

    /// Alter one column of an existing view.
    pub fn column(&mut self, column: impl Into<String>) -> ViewColumn<'_> {
        ViewColumn {
            view: self,
            column: column.into(),
        }
    }
}

/// Handle for altering one view column.
#[must_use = "view column handles only record alterations through their methods"]
pub struct ViewColumn<'a> {
    view: &'a mut ViewBuilder,
    column: String,
}

impl ViewColumn<'_> {
    pub fn rename(self, to: impl Into<String>) {
        self.view.alterations.push(ViewAlteration::RenameColumn {
            from: self.column,
            to: to.into(),
        });
    }

    pub fn default_to(self, value: impl Into<Operand>) {
        self.view.alterations.push(ViewAlteration::DefaultTo {
            column: self.column,
            value: value.into(),
        });
    }
}
