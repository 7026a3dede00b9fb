//! Query translator
//!
//! Lowers a [`Statement`] to SQL for one [`Dialect`], resolving every model
//! and column against [`ModelMetadata`]. Literals always become bind slots;
//! only `NULL` is written inline.

use crate::ast::{
	Delete, Direction, Insert, JoinKind, Placeholder, QueryExpr, QueryExt, Select, Source, Statement,
	Update,
};
use crate::compiled::{BindSource, CompiledQuery};
use crate::dialect::{Construct, Dialect};
use crate::metadata::{ColumnType, ModelMetadata, TableSchema};
use crate::parser::parse_query;
use crate::writer::SqlWriter;
use reinhardt_lang_core::ast::{BinaryOp, ExprKind};
use reinhardt_lang_core::error::{Error, Result};
use reinhardt_lang_core::position::Position;
use tracing::debug;

/// Parse and translate `source` in one step.
///
/// # Examples
///
/// ```
/// use reinhardt_query_lang::dialect::Dialect;
/// use reinhardt_query_lang::metadata::{ColumnType, StaticMetadata, TableSchema};
/// use reinhardt_query_lang::translator::compile;
///
/// let metadata = StaticMetadata::new().table(
///     TableSchema::new("Users", "Users")
///         .column("name", ColumnType::Text)
///         .column("age", ColumnType::Integer),
/// );
/// let query = compile("SELECT name FROM Users WHERE age > 18", &metadata, &Dialect::generic()).unwrap();
/// assert_eq!(query.sql, r#"SELECT "name" FROM "Users" WHERE "age" > ?"#);
/// assert_eq!(query.binds.len(), 1);
/// ```
pub fn compile(source: &str, metadata: &dyn ModelMetadata, dialect: &Dialect) -> Result<CompiledQuery> {
	let statement = parse_query(source)?;
	translate(&statement, metadata, dialect)
}

/// Translate a parsed statement.
pub fn translate(
	statement: &Statement,
	metadata: &dyn ModelMetadata,
	dialect: &Dialect,
) -> Result<CompiledQuery> {
	let mut translator = QueryTranslator::new(metadata, dialect);
	let writer = translator.statement(statement)?;
	let (sql, binds) = writer.finish(dialect);
	debug!(dialect = dialect.name(), binds = binds.len(), "translated query");
	Ok(CompiledQuery {
		sql,
		binds,
		dialect: dialect.name().to_string(),
	})
}

/// A model visible in the statement being translated.
#[derive(Debug, Clone)]
struct ScopeSource {
	/// Name the statement refers to it by (alias or model)
	reference: String,
	/// Name written in qualified SQL (alias or table)
	qualifier: String,
	schema: TableSchema,
}

#[derive(Debug, Default)]
struct Scope {
	sources: Vec<ScopeSource>,
	/// Projection aliases, visible from `GROUP BY` onward
	aliases: Vec<String>,
	aliases_visible: bool,
}

struct QueryTranslator<'m> {
	metadata: &'m dyn ModelMetadata,
	dialect: &'m Dialect,
	scopes: Vec<Scope>,
}

impl<'m> QueryTranslator<'m> {
	fn new(metadata: &'m dyn ModelMetadata, dialect: &'m Dialect) -> Self {
		Self {
			metadata,
			dialect,
			scopes: Vec::new(),
		}
	}

	fn statement(&mut self, statement: &Statement) -> Result<SqlWriter> {
		match statement {
			Statement::Select(select) => self.select(select),
			Statement::Insert(insert) => self.insert(insert),
			Statement::Update(update) => self.update(update),
			Statement::Delete(delete) => self.delete(delete),
			Statement::Empty => Ok(SqlWriter::new()),
		}
	}

	// ── scopes ───────────────────────────────────────────────────────

	fn resolve_source(&self, source: &Source) -> Result<ScopeSource> {
		let schema = self
			.metadata
			.resolve_table(&source.model)
			.ok_or_else(|| Error::UnknownEntity {
				name: source.model.clone(),
				position: source.position,
			})?;
		Ok(ScopeSource {
			reference: source.reference_name().to_string(),
			qualifier: source.alias.clone().unwrap_or_else(|| schema.table.clone()),
			schema,
		})
	}

	fn with_scope<T>(
		&mut self,
		sources: &[&Source],
		f: impl FnOnce(&mut Self) -> Result<T>,
	) -> Result<T> {
		let mut scope = Scope::default();
		for source in sources {
			let resolved = self.resolve_source(source)?;
			if scope.sources.iter().any(|s| s.reference == resolved.reference) {
				return Err(Error::invalid(
					source.position,
					format!("source name '{}' is used more than once", resolved.reference),
				));
			}
			scope.sources.push(resolved);
		}
		self.scopes.push(scope);
		let result = f(self);
		self.scopes.pop();
		result
	}

	fn current_scope(&mut self) -> Option<&mut Scope> {
		self.scopes.last_mut()
	}

	fn find_source(&self, reference: &str) -> Option<&ScopeSource> {
		self.scopes
			.iter()
			.rev()
			.find_map(|scope| scope.sources.iter().find(|s| s.reference == reference))
	}

	/// Resolve an unqualified column name, innermost scope first.
	fn column(&self, name: &str, position: Position) -> Result<(SqlWriter, Option<ColumnType>)> {
		for (depth, scope) in self.scopes.iter().rev().enumerate() {
			let candidates: Vec<&ScopeSource> = scope
				.sources
				.iter()
				.filter(|s| s.schema.find_column(name).is_some())
				.collect();
			match candidates.as_slice() {
				[] => {
					if depth == 0 && scope.aliases_visible && scope.aliases.iter().any(|a| a == name) {
						let mut writer = SqlWriter::new();
						writer.push_identifier(name, self.dialect);
						return Ok((writer, None));
					}
				}
				[source] => {
					let ty = source.schema.find_column(name).map(|c| c.ty);
					let mut writer = SqlWriter::new();
					if depth > 0 || scope.sources.len() > 1 {
						writer.push_qualified(&source.qualifier, name, self.dialect);
					} else {
						writer.push_identifier(name, self.dialect);
					}
					return Ok((writer, ty));
				}
				many => {
					return Err(Error::AmbiguousColumn {
						name: name.to_string(),
						candidates: many.iter().map(|s| s.reference.clone()).collect(),
						position,
					});
				}
			}
		}

		let table = self
			.scopes
			.last()
			.and_then(|scope| scope.sources.first())
			.map(|s| s.schema.model.clone())
			.unwrap_or_default();
		Err(Error::UnknownColumn {
			table,
			name: name.to_string(),
			position,
		})
	}

	fn qualified_column(
		&self,
		reference: &str,
		name: &str,
		position: Position,
	) -> Result<(SqlWriter, Option<ColumnType>)> {
		let source = self.find_source(reference).ok_or_else(|| Error::UnknownEntity {
			name: reference.to_string(),
			position,
		})?;
		let column = source
			.schema
			.find_column(name)
			.ok_or_else(|| Error::UnknownColumn {
				table: source.schema.model.clone(),
				name: name.to_string(),
				position,
			})?;
		let mut writer = SqlWriter::new();
		writer.push_qualified(&source.qualifier, name, self.dialect);
		Ok((writer, Some(column.ty)))
	}

	/// Column type of `expr` when it is a resolvable column reference.
	fn type_of(&self, expr: &QueryExpr) -> Option<ColumnType> {
		let expr = expr.ungrouped();
		match &expr.kind {
			ExprKind::Identifier(name) => self.column(name, expr.position).ok()?.1,
			ExprKind::Member { object, property } => {
				let reference = object.as_identifier()?;
				self.qualified_column(reference, property, expr.position).ok()?.1
			}
			_ => None,
		}
	}

	// ── statements ───────────────────────────────────────────────────

	fn select(&mut self, select: &Select) -> Result<SqlWriter> {
		let sources: Vec<&Source> = select
			.from
			.iter()
			.chain(select.joins.iter().map(|j| &j.source))
			.collect();
		self.with_scope(&sources, |this| this.select_body(select))
	}

	fn select_body(&mut self, select: &Select) -> Result<SqlWriter> {
		let mut w = SqlWriter::new();
		w.push("SELECT");
		if select.distinct {
			w.push_keyword("DISTINCT");
		}
		w.push_space();
		w.push_list(&select.projections, ", ", |w, projection| {
			w.append(self.expr(&projection.expr, None)?);
			if let Some(alias) = &projection.alias {
				w.push(" AS ");
				w.push_identifier(alias, self.dialect);
			}
			Ok(())
		})?;

		let aliases: Vec<String> = select
			.projections
			.iter()
			.filter_map(|p| p.alias.clone())
			.collect();
		if let Some(scope) = self.current_scope() {
			scope.aliases = aliases;
		}

		w.push_keyword("FROM");
		w.push_space();
		w.push_list(&select.from, ", ", |w, source| {
			w.append(self.source_sql(source)?);
			Ok(())
		})?;

		for (i, join) in select.joins.iter().enumerate() {
			let mut args = vec![self.source_sql(&join.source)?];
			match (&join.condition, join.kind) {
				(Some(condition), _) => args.push(self.expr(condition, None)?),
				(None, JoinKind::Cross) => {}
				(None, _) => args.push(self.relationship_condition(select.from.len() + i, join.position)?),
			}
			let rendered = self
				.dialect
				.render(&Construct::Join(join.kind), &args, join.position)?;
			w.push_space();
			w.append(rendered);
		}

		if let Some(filter) = &select.filter {
			w.push_keyword("WHERE");
			w.push_space();
			w.append(self.expr(filter, None)?);
		}

		if let Some(scope) = self.current_scope() {
			scope.aliases_visible = true;
		}

		if !select.group_by.is_empty() {
			w.push_keyword("GROUP BY");
			w.push_space();
			w.push_list(&select.group_by, ", ", |w, expr| {
				w.append(self.expr(expr, None)?);
				Ok(())
			})?;
		}

		if let Some(having) = &select.having {
			w.push_keyword("HAVING");
			w.push_space();
			w.append(self.expr(having, None)?);
		}

		if !select.order_by.is_empty() {
			w.push_keyword("ORDER BY");
			w.push_space();
			w.push_list(&select.order_by, ", ", |w, item| {
				w.append(self.expr(&item.expr, None)?);
				match item.direction {
					Some(Direction::Asc) => w.push(" ASC"),
					Some(Direction::Desc) => w.push(" DESC"),
					None => {}
				}
				Ok(())
			})?;
		}

		if let Some(limit) = &select.limit {
			let mut args = vec![self.expr(&limit.count, Some(ColumnType::Integer))?];
			let construct = match &limit.offset {
				Some(offset) => {
					args.push(self.expr(offset, Some(ColumnType::Integer))?);
					Construct::LimitOffset
				}
				None => Construct::Limit,
			};
			let rendered = self
				.dialect
				.render(&construct, &args, limit.count.position)?;
			w.push_space();
			w.append(rendered);
		}

		Ok(w)
	}

	fn source_sql(&self, source: &Source) -> Result<SqlWriter> {
		let resolved = self.resolve_source(source)?;
		let mut w = SqlWriter::new();
		w.push_identifier(&resolved.schema.table, self.dialect);
		if let Some(alias) = &source.alias {
			w.push(" AS ");
			w.push_identifier(alias, self.dialect);
		}
		Ok(w)
	}

	/// `ON` condition for the source at `index` derived from metadata.
	fn relationship_condition(&self, index: usize, position: Position) -> Result<SqlWriter> {
		let Some(scope) = self.scopes.last() else {
			return Err(Error::invalid(position, "join outside of a select"));
		};
		let target = &scope.sources[index];
		let path = scope.sources[..index].iter().find_map(|earlier| {
			self.metadata
				.resolve_relationship(&earlier.schema.model, &target.schema.model)
				.map(|path| (earlier, path))
		});
		let Some((earlier, path)) = path else {
			return Err(Error::NoRelationship {
				from: scope
					.sources
					.first()
					.map(|s| s.schema.model.clone())
					.unwrap_or_default(),
				to: target.schema.model.clone(),
				position,
			});
		};

		let mut w = SqlWriter::new();
		let pairs = path.from_columns.iter().zip(path.to_columns.iter());
		w.push_list(pairs, " AND ", |w, (from, to)| {
			w.push_qualified(&earlier.qualifier, from, self.dialect);
			w.push(" = ");
			w.push_qualified(&target.qualifier, to, self.dialect);
			Ok(())
		})?;
		Ok(w)
	}

	fn insert(&mut self, insert: &Insert) -> Result<SqlWriter> {
		self.with_scope(&[&insert.source], |this| {
			let Some(source) = this.scopes.last().and_then(|s| s.sources.first()).cloned() else {
				return Err(Error::invalid(insert.position, "insert without a target"));
			};
			let schema = source.schema;

			let columns: Vec<(String, ColumnType)> = if insert.columns.is_empty() {
				schema.columns.iter().map(|c| (c.name.clone(), c.ty)).collect()
			} else {
				insert
					.columns
					.iter()
					.map(|(name, position)| {
						schema
							.find_column(name)
							.map(|c| (c.name.clone(), c.ty))
							.ok_or_else(|| Error::UnknownColumn {
								table: schema.model.clone(),
								name: name.clone(),
								position: *position,
							})
					})
					.collect::<Result<_>>()?
			};

			let mut w = SqlWriter::new();
			w.push("INSERT INTO ");
			w.push_identifier(&schema.table, this.dialect);
			w.push(" (");
			w.push_list(&columns, ", ", |w, (name, _)| {
				w.push_identifier(name, this.dialect);
				Ok(())
			})?;
			w.push(") VALUES ");
			w.push_list(&insert.rows, ", ", |w, row| {
				if row.len() != columns.len() {
					let position = row.first().map(|e| e.position).unwrap_or(insert.position);
					return Err(Error::invalid(
						position,
						format!("expected {} values, found {}", columns.len(), row.len()),
					));
				}
				w.push("(");
				w.push_list(row.iter().zip(&columns), ", ", |w, (value, (_, ty))| {
					w.append(this.expr(value, Some(*ty))?);
					Ok(())
				})?;
				w.push(")");
				Ok(())
			})?;
			Ok(w)
		})
	}

	fn update(&mut self, update: &Update) -> Result<SqlWriter> {
		self.with_scope(&[&update.source], |this| {
			let schema = this.resolve_source(&update.source)?.schema;
			let mut w = SqlWriter::new();
			w.push("UPDATE ");
			w.push_identifier(&schema.table, this.dialect);
			w.push(" SET ");
			w.push_list(&update.assignments, ", ", |w, assignment| {
				let column = schema
					.find_column(&assignment.column)
					.ok_or_else(|| Error::UnknownColumn {
						table: schema.model.clone(),
						name: assignment.column.clone(),
						position: assignment.position,
					})?;
				w.push_identifier(&column.name, this.dialect);
				w.push(" = ");
				w.append(this.expr(&assignment.value, Some(column.ty))?);
				Ok(())
			})?;
			if let Some(filter) = &update.filter {
				w.push_keyword("WHERE");
				w.push_space();
				w.append(this.expr(filter, None)?);
			}
			if let Some(limit) = &update.limit {
				let count = this.expr(limit, Some(ColumnType::Integer))?;
				let rendered = this
					.dialect
					.render(&Construct::UpdateLimit, &[count], limit.position)?;
				w.push_space();
				w.append(rendered);
			}
			Ok(w)
		})
	}

	fn delete(&mut self, delete: &Delete) -> Result<SqlWriter> {
		self.with_scope(&[&delete.source], |this| {
			let schema = this.resolve_source(&delete.source)?.schema;
			let mut w = SqlWriter::new();
			w.push("DELETE FROM ");
			w.push_identifier(&schema.table, this.dialect);
			if let Some(filter) = &delete.filter {
				w.push_keyword("WHERE");
				w.push_space();
				w.append(this.expr(filter, None)?);
			}
			if let Some(limit) = &delete.limit {
				let count = this.expr(limit, Some(ColumnType::Integer))?;
				let rendered = this
					.dialect
					.render(&Construct::DeleteLimit, &[count], limit.position)?;
				w.push_space();
				w.append(rendered);
			}
			Ok(w)
		})
	}

	// ── expressions ──────────────────────────────────────────────────

	/// Translate `expr`; `hint` types any bind slot it produces directly.
	fn expr(&mut self, expr: &QueryExpr, hint: Option<ColumnType>) -> Result<SqlWriter> {
		let position = expr.position;
		match &expr.kind {
			ExprKind::Literal(literal) => {
				let mut w = SqlWriter::new();
				w.push_literal(literal, hint);
				Ok(w)
			}
			ExprKind::Identifier(name) => Ok(self.column(name, position)?.0),
			ExprKind::Member { object, property } => match object.as_identifier() {
				Some(reference) => Ok(self.qualified_column(reference, property, position)?.0),
				None => Err(Error::invalid(position, "only model members can be accessed")),
			},
			ExprKind::Unary { op, operand } => {
				let operand = self.expr(operand, hint)?;
				self.dialect
					.render(&Construct::Unary(*op), &[operand], position)
			}
			ExprKind::Binary { op, left, right } => self.binary(*op, left, right, hint, position),
			ExprKind::Call {
				callee,
				args,
				distinct,
			} => {
				let Some(name) = callee.as_identifier() else {
					return Err(Error::invalid(position, "only named functions can be called"));
				};
				let mut rendered = Vec::with_capacity(args.len());
				for arg in args {
					rendered.push(self.expr(&arg.value, None)?);
				}
				if *distinct {
					if let Some(first) = rendered.first_mut() {
						let mut prefixed = SqlWriter::text("DISTINCT ");
						prefixed.append(std::mem::take(first));
						*first = prefixed;
					}
				}
				self.dialect.render(
					&Construct::Function(name.to_ascii_uppercase()),
					&rendered,
					position,
				)
			}
			ExprKind::Grouped(inner) => {
				let mut w = SqlWriter::text("(");
				w.append(self.expr(inner, hint)?);
				w.push(")");
				Ok(w)
			}
			ExprKind::List(items) => {
				let mut w = SqlWriter::text("(");
				w.push_list(items, ", ", |w, item| {
					w.append(self.expr(&item.value, hint)?);
					Ok(())
				})?;
				w.push(")");
				Ok(w)
			}
			ExprKind::Ext(ext) => self.extension(ext, hint, position),
			ExprKind::Index { .. } | ExprKind::Slice { .. } | ExprKind::Conditional { .. } => {
				Err(Error::invalid(position, "expression is not supported in queries"))
			}
		}
	}

	fn binary(
		&mut self,
		op: BinaryOp,
		left: &QueryExpr,
		right: &QueryExpr,
		hint: Option<ColumnType>,
		position: Position,
	) -> Result<SqlWriter> {
		let (left_hint, right_hint) = match op {
			BinaryOp::And | BinaryOp::Or => (None, None),
			BinaryOp::Concat => (Some(ColumnType::Text), Some(ColumnType::Text)),
			BinaryOp::Add
			| BinaryOp::Sub
			| BinaryOp::Mul
			| BinaryOp::Div
			| BinaryOp::Mod
			| BinaryOp::BitAnd
			| BinaryOp::BitOr
			| BinaryOp::BitXor => (
				self.type_of(right).or(hint),
				self.type_of(left).or(hint),
			),
			_ => (self.type_of(right), self.type_of(left)),
		};
		let left = self.expr(left, left_hint)?;
		let right = self.expr(right, right_hint)?;
		self.dialect
			.render(&Construct::Binary(op), &[left, right], position)
	}

	fn extension(&mut self, ext: &QueryExt, hint: Option<ColumnType>, position: Position) -> Result<SqlWriter> {
		match ext {
			QueryExt::Placeholder(placeholder) => {
				let source = match placeholder {
					Placeholder::Named(name) => BindSource::Named(name.clone()),
					Placeholder::Numbered(index) => BindSource::Numbered(*index),
				};
				let mut w = SqlWriter::new();
				w.push_bind(source, hint);
				Ok(w)
			}
			QueryExt::Star => Ok(SqlWriter::text("*")),
			QueryExt::QualifiedStar(reference) => {
				let source = self.find_source(reference).ok_or_else(|| Error::UnknownEntity {
					name: reference.clone(),
					position,
				})?;
				let mut w = SqlWriter::new();
				w.push_identifier(&source.qualifier, self.dialect);
				w.push(".*");
				Ok(w)
			}
			QueryExt::Between {
				expr,
				low,
				high,
				negated,
			} => {
				let ty = self.type_of(expr);
				let mut w = self.expr(expr, None)?;
				w.push(if *negated { " NOT BETWEEN " } else { " BETWEEN " });
				w.append(self.expr(low, ty)?);
				w.push(" AND ");
				w.append(self.expr(high, ty)?);
				Ok(w)
			}
			QueryExt::IsNull { expr, negated } => {
				let mut w = self.expr(expr, None)?;
				w.push(if *negated { " IS NOT NULL" } else { " IS NULL" });
				Ok(w)
			}
			QueryExt::Case {
				operand,
				branches,
				otherwise,
			} => {
				let operand_type = operand.as_deref().and_then(|o| self.type_of(o));
				let mut w = SqlWriter::text("CASE");
				if let Some(operand) = operand {
					w.push_space();
					w.append(self.expr(operand, None)?);
				}
				for branch in branches {
					w.push_keyword("WHEN");
					w.push_space();
					w.append(self.expr(&branch.condition, operand_type)?);
					w.push_keyword("THEN");
					w.push_space();
					w.append(self.expr(&branch.result, hint)?);
				}
				if let Some(otherwise) = otherwise {
					w.push_keyword("ELSE");
					w.push_space();
					w.append(self.expr(otherwise, hint)?);
				}
				w.push_keyword("END");
				Ok(w)
			}
			QueryExt::Cast { expr, target } => {
				let mut w = SqlWriter::text("CAST(");
				w.append(self.expr(expr, None)?);
				w.push(" AS ");
				w.push(target);
				w.push(")");
				Ok(w)
			}
			QueryExt::Exists(select) => {
				let mut w = SqlWriter::text("EXISTS (");
				w.append(self.select(select)?);
				w.push(")");
				Ok(w)
			}
			QueryExt::Subquery(select) => {
				let mut w = SqlWriter::text("(");
				w.append(self.select(select)?);
				w.push(")");
				Ok(w)
			}
		}
	}
}
