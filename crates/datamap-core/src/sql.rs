// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

//! Reference SQL command builder.
//!
//! [`SqlCommandBuilder`] renders named-placeholder SQL for the dialect it is
//! configured with.
//!
//! # Dialects
//!
//! | Dialect | Identifiers | Placeholders | Paging | Identity |
//! |---------|-------------|--------------|--------|----------|
//! | SQLite | `"name"` | `@name` | `LIMIT n OFFSET m` | `last_insert_rowid()` |
//! | SQL Server | `[name]` | `@name` | `OFFSET m ROWS FETCH NEXT n ROWS ONLY` | `SCOPE_IDENTITY()` |
//! | ANSI | `"name"` | `:name` | `LIMIT n OFFSET m` | unsupported |

use std::fmt::Write as _;

use crate::{
    binder::Params,
    command::{Aggregate, Command, CommandBuilder, Projection, Select},
    descriptor::{MemberDescriptor, TypeDescriptor},
    error::MappingError,
    filter::{CompareOp, Filter},
    value::Value
};

/// SQL flavor rendered by [`SqlCommandBuilder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    /// SQLite.
    #[default]
    Sqlite,

    /// Microsoft SQL Server.
    SqlServer,

    /// Standard SQL without identity retrieval.
    Ansi
}

impl Dialect {
    /// Quote an identifier, doubling embedded quote characters.
    pub fn quote(&self, identifier: &str) -> String {
        match self {
            Self::SqlServer => format!("[{}]", identifier.replace(']', "]]")),
            Self::Sqlite | Self::Ansi => format!("\"{}\"", identifier.replace('"', "\"\""))
        }
    }

    /// Placeholder for a named parameter.
    pub fn placeholder(&self, name: &str) -> String {
        match self {
            Self::Sqlite | Self::SqlServer => format!("@{name}"),
            Self::Ansi => format!(":{name}")
        }
    }

    /// Identity retrieval query.
    pub fn identity_query(&self) -> Option<&'static str> {
        match self {
            Self::Sqlite => Some("SELECT last_insert_rowid()"),
            Self::SqlServer => Some("SELECT SCOPE_IDENTITY()"),
            Self::Ansi => None
        }
    }

    /// Boolean literal.
    pub const fn bool_literal(&self, value: bool) -> &'static str {
        match (self, value) {
            (Self::Sqlite | Self::SqlServer, true) => "1",
            (Self::Sqlite | Self::SqlServer, false) => "0",
            (Self::Ansi, true) => "TRUE",
            (Self::Ansi, false) => "FALSE"
        }
    }
}

/// Named-placeholder SQL builder.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqlCommandBuilder {
    dialect: Dialect
}

impl SqlCommandBuilder {
    /// Builder for `dialect`.
    pub const fn new(dialect: Dialect) -> Self {
        Self {
            dialect
        }
    }

    /// Configured dialect.
    pub const fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn column_of(&self, descriptor: &TypeDescriptor, name: &str) -> Result<String, MappingError> {
        descriptor.require_member(name).map(|m| self.quote(m.column()))
    }

    fn aggregate(&self, descriptor: &TypeDescriptor, aggregate: &Aggregate) -> Result<String, MappingError> {
        let target = match &aggregate.column {
            Some(column) => self.column_of(descriptor, column)?,
            None => "*".to_owned()
        };
        Ok(format!(
            "{}({}) AS {}",
            aggregate.function.as_sql(),
            target,
            self.quote(&aggregate.alias)
        ))
    }

    fn projection(&self, descriptor: &TypeDescriptor, projection: &Projection) -> Result<String, MappingError> {
        let parts: Vec<String> = match projection {
            Projection::Members => descriptor
                .members()
                .iter()
                .filter(|m| !m.is_not_mapped() && m.shape().is_basic())
                .map(|m| self.quote(m.column()))
                .collect(),
            Projection::Columns(columns) => {
                columns
                    .iter()
                    .map(|c| self.column_of(descriptor, c))
                    .collect::<Result<_, _>>()?
            }
            Projection::Aggregates(aggregates) => {
                aggregates
                    .iter()
                    .map(|a| self.aggregate(descriptor, a))
                    .collect::<Result<_, _>>()?
            }
        };
        Ok(if parts.is_empty() { "*".to_owned() } else { parts.join(", ") })
    }

    fn render_filter(
        &self,
        descriptor: &TypeDescriptor,
        filter: &Filter,
        params: &mut Params
    ) -> Result<String, MappingError> {
        let bind = |params: &mut Params, value: &Value| {
            let name = (params.len()..)
                .map(|index| format!("p_{index}"))
                .find(|name| params.get(name).is_none())
                .unwrap_or_default();
            let placeholder = self.placeholder(&name);
            params.insert(name, value.clone());
            placeholder
        };
        Ok(match filter {
            Filter::Compare {
                column,
                op,
                value
            } => {
                let column = self.column_of(descriptor, column)?;
                match (op, value) {
                    (CompareOp::Eq, Value::Null) => format!("{column} IS NULL"),
                    (CompareOp::Ne, Value::Null) => format!("{column} IS NOT NULL"),
                    _ => format!("{column} {} {}", op.as_sql(), bind(params, value))
                }
            }
            Filter::Like {
                column,
                pattern
            } => {
                let column = self.column_of(descriptor, column)?;
                format!("{column} LIKE {}", bind(params, &Value::from(pattern.as_str())))
            }
            Filter::In {
                column,
                values
            } => {
                let column = self.column_of(descriptor, column)?;
                if values.is_empty() {
                    "1 = 0".to_owned()
                } else {
                    let list: Vec<String> = values.iter().map(|v| bind(params, v)).collect();
                    format!("{column} IN ({})", list.join(", "))
                }
            }
            Filter::IsNull {
                column
            } => format!("{} IS NULL", self.column_of(descriptor, column)?),
            Filter::IsNotNull {
                column
            } => format!("{} IS NOT NULL", self.column_of(descriptor, column)?),
            Filter::And(parts) => self.join(descriptor, parts, " AND ", "1 = 1", params)?,
            Filter::Or(parts) => self.join(descriptor, parts, " OR ", "1 = 0", params)?,
            Filter::Not(inner) => format!("NOT ({})", self.render_filter(descriptor, inner, params)?),
            Filter::Raw {
                text,
                params: raw
            } => {
                if let Some(name) = params.shared_name(raw) {
                    return Err(MappingError::DuplicateParameter {
                        name: name.to_owned()
                    });
                }
                params.extend(raw.clone());
                text.clone()
            }
        })
    }

    fn join(
        &self,
        descriptor: &TypeDescriptor,
        parts: &[Filter],
        separator: &str,
        empty: &str,
        params: &mut Params
    ) -> Result<String, MappingError> {
        if parts.is_empty() {
            return Ok(empty.to_owned());
        }
        let rendered = parts
            .iter()
            .map(|part| self.render_filter(descriptor, part, params).map(|text| format!("({text})")))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rendered.join(separator))
    }
}

impl CommandBuilder for SqlCommandBuilder {
    fn quote(&self, identifier: &str) -> String {
        self.dialect.quote(identifier)
    }

    fn placeholder(&self, name: &str) -> String {
        self.dialect.placeholder(name)
    }

    fn to_literal(&self, value: &Value) -> String {
        match value {
            Value::Bool(b) => self.dialect.bool_literal(*b).to_owned(),
            other => other.to_string()
        }
    }

    fn identity_query(&self) -> Option<String> {
        self.dialect.identity_query().map(str::to_owned)
    }

    fn build_select(&self, descriptor: &TypeDescriptor, select: &Select) -> Result<Command, MappingError> {
        let mut text = format!(
            "SELECT {} FROM {}",
            self.projection(descriptor, &select.projection)?,
            self.table_name(descriptor)
        );
        let mut params = Params::new();
        if let Some(filter) = &select.filter {
            let (clause, bound) = self.build_where(descriptor, filter)?;
            let _ = write!(text, " WHERE {clause}");
            params = bound;
        }
        if !select.order.is_empty() {
            let terms = select
                .order
                .iter()
                .map(|o| Ok(format!("{} {}", self.column_of(descriptor, &o.column)?, o.direction.as_sql())))
                .collect::<Result<Vec<_>, MappingError>>()?;
            let _ = write!(text, " ORDER BY {}", terms.join(", "));
        }
        if self.dialect == Dialect::SqlServer && select.order.is_empty() && (select.limit.is_some() || select.offset.is_some()) {
            text.push_str(" ORDER BY (SELECT NULL)");
        }
        Ok(Command::with_params(self.add_limit_offset(&text, select.limit, select.offset), params))
    }

    fn build_insert(&self, descriptor: &TypeDescriptor, columns: &[&MemberDescriptor]) -> String {
        if columns.is_empty() {
            return format!("INSERT INTO {} DEFAULT VALUES", self.table_name(descriptor));
        }
        let names: Vec<String> = columns.iter().map(|m| self.quote(m.column())).collect();
        let values: Vec<String> = columns.iter().map(|m| self.placeholder(m.name())).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table_name(descriptor),
            names.join(", "),
            values.join(", ")
        )
    }

    fn build_update(&self, descriptor: &TypeDescriptor, columns: &[&MemberDescriptor]) -> String {
        let assignments: Vec<String> = columns
            .iter()
            .map(|m| format!("{} = {}", self.quote(m.column()), self.placeholder(m.name())))
            .collect();
        format!("UPDATE {} SET {}", self.table_name(descriptor), assignments.join(", "))
    }

    fn build_delete(&self, descriptor: &TypeDescriptor) -> String {
        format!("DELETE FROM {}", self.table_name(descriptor))
    }

    fn build_where(&self, descriptor: &TypeDescriptor, filter: &Filter) -> Result<(String, Params), MappingError> {
        let mut params = Params::new();
        let text = self.render_filter(descriptor, filter, &mut params)?;
        Ok((text, params))
    }

    fn add_limit_offset(&self, text: &str, limit: Option<u64>, offset: Option<u64>) -> String {
        let mut out = text.to_owned();
        match self.dialect {
            Dialect::SqlServer => {
                if limit.is_some() || offset.is_some() {
                    let _ = write!(out, " OFFSET {} ROWS", offset.unwrap_or(0));
                }
                if let Some(limit) = limit {
                    let _ = write!(out, " FETCH NEXT {limit} ROWS ONLY");
                }
            }
            Dialect::Sqlite | Dialect::Ansi => {
                match (limit, offset) {
                    (Some(limit), _) => {
                        let _ = write!(out, " LIMIT {limit}");
                    }
                    (None, Some(_)) if self.dialect == Dialect::Sqlite => out.push_str(" LIMIT -1"),
                    (None, _) => {}
                }
                if let Some(offset) = offset {
                    let _ = write!(out, " OFFSET {offset}");
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        command::{AggregateFn, Order},
        error::ConversionError,
        filter::col,
        mapping::{EntityMapping, Mapped, MemberDef},
        registry::{DescriptorRegistry, RegistryExt},
        shape::{FieldType, TypeShape}
    };

    #[derive(Default)]
    struct Person {
        id:   i64,
        name: String,
        age:  i32
    }

    impl FieldType for Person {
        fn shape() -> TypeShape {
            TypeShape::composite::<Self>()
        }

        fn to_value(&self) -> Result<Value, ConversionError> {
            Err(ConversionError::not_scalar::<Self>())
        }

        fn from_value(_: Value) -> Result<Self, ConversionError> {
            Err(ConversionError::not_scalar::<Self>())
        }
    }

    impl Mapped for Person {
        fn mapping() -> EntityMapping<Self> {
            EntityMapping::new("Person")
                .table("people")
                .member(MemberDef::of::<i64>("Id", |p: &Person| p.id.to_value(), |p: &mut Person, v| {
                    p.id = i64::from_value(v)?;
                    Ok(())
                }))
                .member(
                    MemberDef::of::<String>("Name", |p: &Person| p.name.to_value(), |p: &mut Person, v| {
                        p.name = String::from_value(v)?;
                        Ok(())
                    })
                    .column(Some("full_name"))
                )
                .member(
                    MemberDef::of::<i32>("Age", |p: &Person| p.age.to_value(), |p: &mut Person, v| {
                        p.age = i32::from_value(v)?;
                        Ok(())
                    })
                    .column(None)
                )
        }
    }

    fn person() -> std::sync::Arc<TypeDescriptor> {
        DescriptorRegistry::new().describe::<Person>().unwrap()
    }

    #[test]
    fn select_all_members() {
        let sql = SqlCommandBuilder::default();
        let command = sql.build_select(&person(), &Select::new()).unwrap();
        assert_eq!(command.text, r#"SELECT "Id", "full_name", "Age" FROM "people""#);
        assert!(command.params.is_empty());
    }

    #[test]
    fn select_with_filter_order_and_paging() {
        let sql = SqlCommandBuilder::default();
        let select = Select::new()
            .filter(col("Age").ge(18).and(col("name").like("A%")))
            .order_by(Order::desc("Age"))
            .limit(10)
            .offset(20);
        let command = sql.build_select(&person(), &select).unwrap();
        assert_eq!(
            command.text,
            r#"SELECT "Id", "full_name", "Age" FROM "people" WHERE ("Age" >= @p_0) AND ("full_name" LIKE @p_1) ORDER BY "Age" DESC LIMIT 10 OFFSET 20"#
        );
        assert_eq!(command.params.to_string(), "p_0=18, p_1='A%'");
    }

    #[test]
    fn null_comparison_becomes_is_null() {
        let sql = SqlCommandBuilder::default();
        let (text, params) = sql.build_where(&person(), &col("Name").eq(Value::Null)).unwrap();
        assert_eq!(text, r#""full_name" IS NULL"#);
        assert!(params.is_empty());
    }

    #[test]
    fn raw_parameters_never_replace_generated_ones() {
        let sql = SqlCommandBuilder::default();
        let raw = || Filter::raw(r#""Age" > @p_0"#, Params::new().with("p_0", 1));

        let (text, params) = sql.build_where(&person(), &raw().and(col("Id").eq(5))).unwrap();
        assert_eq!(text, r#"("Age" > @p_0) AND ("Id" = @p_1)"#);
        assert_eq!(params.to_string(), "p_0=1, p_1=5");

        let err = sql.build_where(&person(), &col("Id").eq(5).and(raw())).unwrap_err();
        assert_eq!(err, MappingError::DuplicateParameter {
            name: "p_0".into()
        });
    }

    #[test]
    fn in_and_not() {
        let sql = SqlCommandBuilder::default();
        let (text, params) = sql.build_where(&person(), &!col("Id").is_in([1, 2])).unwrap();
        assert_eq!(text, r#"NOT ("Id" IN (@p_0, @p_1))"#);
        assert_eq!(params.len(), 2);

        let (text, _) = sql.build_where(&person(), &col("Id").is_in(Vec::<i64>::new())).unwrap();
        assert_eq!(text, "1 = 0");
    }

    #[test]
    fn unknown_column_is_an_error() {
        let sql = SqlCommandBuilder::default();
        let err = sql.build_where(&person(), &col("Salary").gt(1)).unwrap_err();
        assert!(matches!(err, MappingError::UnknownMember { .. }));
    }

    #[test]
    fn insert_update_delete() {
        let sql = SqlCommandBuilder::default();
        let descriptor = person();
        let columns: Vec<&MemberDescriptor> = descriptor.column_mapped().collect();
        assert_eq!(
            sql.build_insert(&descriptor, &columns),
            r#"INSERT INTO "people" ("full_name", "Age") VALUES (@Name, @Age)"#
        );
        assert_eq!(
            sql.build_update(&descriptor, &columns),
            r#"UPDATE "people" SET "full_name" = @Name, "Age" = @Age"#
        );
        assert_eq!(sql.build_delete(&descriptor), r#"DELETE FROM "people""#);
        assert_eq!(sql.build_insert(&descriptor, &[]), r#"INSERT INTO "people" DEFAULT VALUES"#);
    }

    #[test]
    fn aggregates_projection() {
        let sql = SqlCommandBuilder::default();
        let select = Select::new().aggregates(vec![Aggregate::count_all(), Aggregate::of(AggregateFn::Max, "Age")]);
        let command = sql.build_select(&person(), &select).unwrap();
        assert_eq!(
            command.text,
            r#"SELECT COUNT(*) AS "count", MAX("Age") AS "max_Age" FROM "people""#
        );
    }

    #[test]
    fn sql_server_paging() {
        let sql = SqlCommandBuilder::new(Dialect::SqlServer);
        let command = sql.build_select(&person(), &Select::new().columns(["Id"]).limit(5).offset(10)).unwrap();
        assert_eq!(
            command.text,
            "SELECT [Id] FROM [people] ORDER BY (SELECT NULL) OFFSET 10 ROWS FETCH NEXT 5 ROWS ONLY"
        );
        assert_eq!(sql.identity_query().as_deref(), Some("SELECT SCOPE_IDENTITY()"));
    }

    #[test]
    fn sqlite_offset_without_limit() {
        let sql = SqlCommandBuilder::default();
        assert_eq!(sql.add_limit_offset("SELECT 1", None, Some(3)), "SELECT 1 LIMIT -1 OFFSET 3");
        assert_eq!(sql.add_limit_offset("SELECT 1", None, None), "SELECT 1");
    }

    #[test]
    fn literals_and_quoting() {
        let sql = SqlCommandBuilder::default();
        assert_eq!(sql.to_literal(&Value::Bool(true)), "1");
        assert_eq!(sql.to_literal(&Value::from("it's")), "'it''s'");
        assert_eq!(sql.quote("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(SqlCommandBuilder::new(Dialect::Ansi).to_literal(&Value::Bool(false)), "FALSE");
        assert_eq!(SqlCommandBuilder::new(Dialect::Ansi).placeholder("x"), ":x");
    }
}
