//! Statement parser for the query language.
//!
//! Expressions are delegated to the shared precedence-climbing parser via
//! [`QueryGrammar`]; this module only handles clause structure.

use crate::ast::{
	Assignment, Delete, Direction, Insert, Join, JoinKind, LimitClause, OrderItem, Projection,
	QueryExpr, Select, Source, Statement, Update,
};
use crate::grammar::QueryGrammar;
use reinhardt_lang_core::error::Result;
use reinhardt_lang_core::parser::Parser;

type QueryParser<'a> = Parser<'a, QueryGrammar>;

/// Parse one statement.
///
/// A trailing `;` is accepted. Blank input yields [`Statement::Empty`].
///
/// # Examples
///
/// ```
/// use reinhardt_query_lang::ast::Statement;
/// use reinhardt_query_lang::parser::parse_query;
///
/// let statement = parse_query("SELECT name FROM Users WHERE age > 18").unwrap();
/// assert!(matches!(statement, Statement::Select(_)));
/// assert_eq!(parse_query("  -- nothing\n").unwrap(), Statement::Empty);
/// ```
pub fn parse_query(source: &str) -> Result<Statement> {
	let mut parser = Parser::new(QueryGrammar, source);

	let statement = match parser.peek()? {
		None => return Ok(Statement::Empty),
		Some(token) if token.is_operator(";") => {
			parser.next_token()?;
			if parser.is_eof()? {
				return Ok(Statement::Empty);
			}
			return Err(parser.error_expected(["end of input"]));
		}
		Some(token) if token.is_keyword("SELECT") => Statement::Select(parse_select(&mut parser)?),
		Some(token) if token.is_keyword("INSERT") => Statement::Insert(parse_insert(&mut parser)?),
		Some(token) if token.is_keyword("UPDATE") => Statement::Update(parse_update(&mut parser)?),
		Some(token) if token.is_keyword("DELETE") => Statement::Delete(parse_delete(&mut parser)?),
		Some(_) => return Err(parser.error_expected(["SELECT", "INSERT", "UPDATE", "DELETE"])),
	};

	parser.eat_operator(";")?;
	if !parser.is_eof()? {
		return Err(parser.error_expected(["end of input"]));
	}
	Ok(statement)
}

/// Parse a `SELECT` statement starting at the `SELECT` keyword.
pub(crate) fn parse_select(parser: &mut QueryParser<'_>) -> Result<Select> {
	let position = parser.expect_keyword("SELECT")?.position;
	let distinct = parser.eat_keyword("DISTINCT")?;
	if !distinct {
		parser.eat_keyword("ALL")?;
	}

	let mut projections = Vec::new();
	loop {
		let expr = parser.parse_expression()?;
		let alias = parse_alias(parser)?;
		projections.push(Projection { expr, alias });
		if !parser.eat_operator(",")? {
			break;
		}
	}

	parser.expect_keyword("FROM")?;
	let mut from = Vec::new();
	loop {
		from.push(parse_source(parser)?);
		if !parser.eat_operator(",")? {
			break;
		}
	}

	let mut joins = Vec::new();
	while let Some(join) = parse_join(parser)? {
		joins.push(join);
	}

	let filter = parse_where(parser)?;

	let mut group_by = Vec::new();
	if parser.eat_keyword("GROUP")? {
		parser.expect_keyword("BY")?;
		group_by = parse_expression_list(parser)?;
	}

	let having = if parser.eat_keyword("HAVING")? {
		Some(parser.parse_expression()?)
	} else {
		None
	};

	let mut order_by = Vec::new();
	if parser.eat_keyword("ORDER")? {
		parser.expect_keyword("BY")?;
		loop {
			let expr = parser.parse_expression()?;
			let direction = if parser.eat_keyword("ASC")? {
				Some(Direction::Asc)
			} else if parser.eat_keyword("DESC")? {
				Some(Direction::Desc)
			} else {
				None
			};
			order_by.push(OrderItem { expr, direction });
			if !parser.eat_operator(",")? {
				break;
			}
		}
	}

	let limit = if parser.eat_keyword("LIMIT")? {
		let first = parser.parse_expression()?;
		if parser.eat_keyword("OFFSET")? {
			Some(LimitClause {
				count: first,
				offset: Some(parser.parse_expression()?),
			})
		} else if parser.eat_operator(",")? {
			// `LIMIT offset, count`
			Some(LimitClause {
				count: parser.parse_expression()?,
				offset: Some(first),
			})
		} else {
			Some(LimitClause {
				count: first,
				offset: None,
			})
		}
	} else {
		None
	};

	Ok(Select {
		distinct,
		projections,
		from,
		joins,
		filter,
		group_by,
		having,
		order_by,
		limit,
		position,
	})
}

fn parse_insert(parser: &mut QueryParser<'_>) -> Result<Insert> {
	let position = parser.expect_keyword("INSERT")?.position;
	parser.expect_keyword("INTO")?;
	let (model, model_position) = parser.expect_identifier()?;
	let source = Source {
		model,
		alias: None,
		position: model_position,
	};

	let mut columns = Vec::new();
	if parser.eat_operator("(")? {
		loop {
			columns.push(parser.expect_identifier()?);
			if !parser.eat_operator(",")? {
				break;
			}
		}
		parser.expect_operator(")")?;
	}

	parser.expect_keyword("VALUES")?;
	let mut rows = Vec::new();
	loop {
		parser.expect_operator("(")?;
		rows.push(parse_expression_list(parser)?);
		parser.expect_operator(")")?;
		if !parser.eat_operator(",")? {
			break;
		}
	}

	Ok(Insert {
		source,
		columns,
		rows,
		position,
	})
}

fn parse_update(parser: &mut QueryParser<'_>) -> Result<Update> {
	let position = parser.expect_keyword("UPDATE")?.position;
	let (model, model_position) = parser.expect_identifier()?;
	let source = Source {
		model,
		alias: None,
		position: model_position,
	};

	parser.expect_keyword("SET")?;
	let mut assignments = Vec::new();
	loop {
		let (column, column_position) = parser.expect_identifier()?;
		parser.expect_operator("=")?;
		let value = parser.parse_expression()?;
		assignments.push(Assignment {
			column,
			position: column_position,
			value,
		});
		if !parser.eat_operator(",")? {
			break;
		}
	}

	let filter = parse_where(parser)?;
	let limit = parse_dml_limit(parser)?;
	Ok(Update {
		source,
		assignments,
		filter,
		limit,
		position,
	})
}

fn parse_delete(parser: &mut QueryParser<'_>) -> Result<Delete> {
	let position = parser.expect_keyword("DELETE")?.position;
	parser.expect_keyword("FROM")?;
	let (model, model_position) = parser.expect_identifier()?;
	let source = Source {
		model,
		alias: None,
		position: model_position,
	};
	let filter = parse_where(parser)?;
	let limit = parse_dml_limit(parser)?;
	Ok(Delete {
		source,
		filter,
		limit,
		position,
	})
}

fn parse_where(parser: &mut QueryParser<'_>) -> Result<Option<QueryExpr>> {
	if parser.eat_keyword("WHERE")? {
		return Ok(Some(parser.parse_expression()?));
	}
	Ok(None)
}

fn parse_dml_limit(parser: &mut QueryParser<'_>) -> Result<Option<QueryExpr>> {
	if parser.eat_keyword("LIMIT")? {
		return Ok(Some(parser.parse_expression()?));
	}
	Ok(None)
}

fn parse_expression_list(parser: &mut QueryParser<'_>) -> Result<Vec<QueryExpr>> {
	let mut items = Vec::new();
	loop {
		items.push(parser.parse_expression()?);
		if !parser.eat_operator(",")? {
			return Ok(items);
		}
	}
}

/// `[AS] alias`
fn parse_alias(parser: &mut QueryParser<'_>) -> Result<Option<String>> {
	if parser.eat_keyword("AS")? {
		return Ok(Some(parser.expect_identifier()?.0));
	}
	if parser.at_identifier()? {
		return Ok(Some(parser.expect_identifier()?.0));
	}
	Ok(None)
}

fn parse_source(parser: &mut QueryParser<'_>) -> Result<Source> {
	let (model, position) = parser.expect_identifier()?;
	let alias = parse_alias(parser)?;
	Ok(Source {
		model,
		alias,
		position,
	})
}

fn parse_join(parser: &mut QueryParser<'_>) -> Result<Option<Join>> {
	let position = parser.position()?;
	let kind = if parser.eat_keyword("JOIN")? {
		JoinKind::Inner
	} else {
		let kind = if parser.eat_keyword("INNER")? {
			JoinKind::Inner
		} else if parser.eat_keyword("CROSS")? {
			JoinKind::Cross
		} else if parser.eat_keyword("LEFT")? {
			parser.eat_keyword("OUTER")?;
			JoinKind::Left
		} else if parser.eat_keyword("RIGHT")? {
			parser.eat_keyword("OUTER")?;
			JoinKind::Right
		} else if parser.eat_keyword("FULL")? {
			parser.eat_keyword("OUTER")?;
			JoinKind::Full
		} else {
			return Ok(None);
		};
		parser.expect_keyword("JOIN")?;
		kind
	};

	let source = parse_source(parser)?;
	let condition = if kind != JoinKind::Cross && parser.eat_keyword("ON")? {
		Some(parser.parse_expression()?)
	} else {
		None
	};
	Ok(Some(Join {
		kind,
		source,
		condition,
		position,
	}))
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ast::{Placeholder, QueryExt};
	use reinhardt_lang_core::ast::{BinaryOp, ExprKind, Literal};
	use reinhardt_lang_core::error::Error;
	use rstest::rstest;

	fn select(source: &str) -> Select {
		match parse_query(source).unwrap() {
			Statement::Select(select) => select,
			other => panic!("expected select, got {:?}", other),
		}
	}

	#[rstest]
	fn test_parse_simple_select() {
		let select = select("SELECT name FROM Users WHERE age > 18");
		assert_eq!(select.projections.len(), 1);
		assert_eq!(select.from[0].model, "Users");
		let filter = select.filter.unwrap();
		assert!(matches!(filter.kind, ExprKind::Binary { op: BinaryOp::Gt, .. }));
	}

	#[rstest]
	fn test_parse_aliases_and_joins() {
		let select = select(
			"SELECT u.name AS author, p.title FROM Users u \
			 LEFT OUTER JOIN Posts AS p ON p.user_id = u.id JOIN Tags",
		);
		assert_eq!(select.projections[0].alias.as_deref(), Some("author"));
		assert_eq!(select.from[0].alias.as_deref(), Some("u"));
		assert_eq!(select.joins.len(), 2);
		assert_eq!(select.joins[0].kind, JoinKind::Left);
		assert!(select.joins[0].condition.is_some());
		assert_eq!(select.joins[1].kind, JoinKind::Inner);
		assert!(select.joins[1].condition.is_none());
	}

	#[rstest]
	#[case("SELECT a FROM T LIMIT 10", 10, None)]
	#[case("SELECT a FROM T LIMIT 10 OFFSET 5", 10, Some(5))]
	#[case("SELECT a FROM T LIMIT 5, 10", 10, Some(5))]
	fn test_parse_limit_forms(#[case] source: &str, #[case] count: i64, #[case] offset: Option<i64>) {
		let limit = select(source).limit.unwrap();
		assert_eq!(limit.count.kind, ExprKind::Literal(Literal::Integer(count)));
		assert_eq!(
			limit.offset.map(|o| o.kind),
			offset.map(|o| ExprKind::Literal(Literal::Integer(o)))
		);
	}

	#[rstest]
	fn test_parse_extensions() {
		let select = select(
			"SELECT COUNT(DISTINCT id), CASE WHEN a IS NULL THEN 1 ELSE 2 END \
			 FROM T WHERE a NOT BETWEEN :lo: AND ?1 AND b NOT IN (1, 2) AND EXISTS (SELECT x FROM U)",
		);
		assert!(matches!(
			select.projections[0].expr.kind,
			ExprKind::Call { distinct: true, .. }
		));
		assert!(matches!(
			select.projections[1].expr.kind,
			ExprKind::Ext(QueryExt::Case { .. })
		));

		let mut placeholders = Vec::new();
		select.filter.as_ref().unwrap().walk(&mut |e| {
			if let ExprKind::Ext(QueryExt::Placeholder(p)) = &e.kind {
				placeholders.push(p.clone());
			}
		});
		assert_eq!(
			placeholders,
			vec![Placeholder::Named("lo".into()), Placeholder::Numbered(1)]
		);
	}

	#[rstest]
	fn test_parse_dml() {
		assert!(matches!(
			parse_query("INSERT INTO Users (name, age) VALUES ('a', 1), ('b', 2);").unwrap(),
			Statement::Insert(Insert { ref rows, .. }) if rows.len() == 2
		));
		assert!(matches!(
			parse_query("UPDATE Users SET age = age + 1 WHERE id = 3 LIMIT 1").unwrap(),
			Statement::Update(Update { limit: Some(_), .. })
		));
		assert!(matches!(
			parse_query("DELETE FROM Users").unwrap(),
			Statement::Delete(Delete { filter: None, .. })
		));
	}

	#[rstest]
	#[case("")]
	#[case("   ")]
	#[case("/* only a comment */")]
	#[case(";")]
	fn test_blank_input_is_empty(#[case] source: &str) {
		assert_eq!(parse_query(source).unwrap(), Statement::Empty);
	}

	#[rstest]
	fn test_missing_from_reports_expected() {
		let error = parse_query("SELECT a WHERE b").unwrap_err();
		match error {
			Error::Syntax { expected, found, .. } => {
				assert_eq!(expected, vec!["FROM".to_string()]);
				assert_eq!(found, "'WHERE'");
			}
			other => panic!("unexpected error {:?}", other),
		}
	}

	#[rstest]
	fn test_trailing_garbage_is_rejected() {
		assert!(matches!(
			parse_query("SELECT a FROM T extra junk"),
			Err(Error::Syntax { .. })
		));
	}
}
