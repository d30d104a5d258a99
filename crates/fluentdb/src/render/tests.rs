use super::*;
use crate::condition::Condition;
use crate::table::{Direction, JoinType, Order, TableRef};

fn state_from(table: &str, alias: Option<&str>) -> QueryState {
    let mut state = QueryState::new();
    state
        .tables
        .push(TableRef::root(table, alias.map(str::to_string)));
    state
}

fn row(pairs: &[(&str, Value)]) -> InsertRow {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

#[test]
fn select_basic() {
    let state = state_from("user", None);
    let stmt = select(&state).unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `user`");
    assert!(stmt.params.is_empty());
}

#[test]
fn select_alias_where_limit() {
    let mut state = state_from("user", Some("u"));
    state.wheres.push(Condition::compare("u.age", ">", 18));
    state.limit = Some(5);

    let stmt = select(&state).unwrap();
    assert_eq!(stmt.sql, "SELECT * FROM `user` `u` WHERE `u`.`age` > ? LIMIT 5");
    assert_eq!(stmt.params, vec![Value::Int(18)]);
}

#[test]
fn placeholders_follow_call_order() {
    let mut state = state_from("user", None);
    state.wheres.push(Condition::compare("a", "=", 1));
    state.wheres.push(Condition::compare("b", "!=", "two").or());
    state.wheres.push(Condition::raw("c IS NOT NULL"));
    state.groups.push(Order::new("a", None));
    state.havings.push(Condition::compare("SUM(b)", ">=", 3.5));

    let stmt = select(&state).unwrap();
    assert_eq!(
        stmt.sql,
        "SELECT * FROM `user` WHERE `a` = ? OR `b` != ? AND c IS NOT NULL \
         GROUP BY `a` HAVING SUM(`b`) >= ?"
    );
    assert_eq!(stmt.placeholder_count(), 3);
    assert_eq!(
        stmt.params,
        vec![Value::Int(1), Value::from("two"), Value::Float(3.5)]
    );
}

#[test]
fn clause_order_independent_of_call_order() {
    // Filled "backwards" on purpose.
    let mut state = QueryState::new();
    state.offset = Some(20);
    state.limit = Some(10);
    state.orders.push(Order::new("total", Some(Direction::Desc)));
    state.havings.push(Condition::compare("COUNT(id)", ">", 1));
    state.rollup = true;
    state.groups.push(Order::new("class_id", None));
    state.wheres.push(Condition::compare("status", "=", "active"));
    state.tables.push(TableRef::root("order", Some("o".to_string())));

    let sql = select(&state).unwrap().sql;
    assert_eq!(
        sql,
        "SELECT * FROM `order` `o` WHERE `status` = ? GROUP BY `class_id` WITH ROLLUP \
         HAVING COUNT(`id`) > ? ORDER BY `total` DESC LIMIT 10 OFFSET 20"
    );

    let group = sql.find("GROUP BY").unwrap();
    let having = sql.find("HAVING").unwrap();
    let order = sql.find("ORDER BY").unwrap();
    assert!(group < having && having < order);
}

#[test]
fn rollup_without_group_is_dropped() {
    let mut state = state_from("user", None);
    state.rollup = true;
    assert_eq!(select(&state).unwrap().sql, "SELECT * FROM `user`");
}

#[test]
fn offset_without_limit_uses_max_limit() {
    let mut state = state_from("user", None);
    state.offset = Some(100);
    assert_eq!(
        select(&state).unwrap().sql,
        "SELECT * FROM `user` LIMIT 18446744073709551615 OFFSET 100"
    );
}

#[test]
fn joins_render_with_type_and_alias() {
    let mut state = state_from("user", Some("u"));
    state.tables.push(TableRef::join(
        "class",
        Some("c".to_string()),
        "u.class_id = c.id",
        JoinType::Left,
    ));
    state
        .tables
        .push(TableRef::join("school", None, "c.school_id = school.id", JoinType::Plain));
    state.fields = "u.name, c.name".to_string();

    assert_eq!(
        select(&state).unwrap().sql,
        "SELECT u.name, c.name FROM `user` `u` LEFT JOIN `class` `c` ON u.class_id = c.id \
         JOIN `school` ON c.school_id = school.id"
    );
}

#[test]
fn multiple_roots_are_comma_separated() {
    let mut state = state_from("a", None);
    state.tables.push(TableRef::root("b", None));
    assert_eq!(select(&state).unwrap().sql, "SELECT * FROM `a`, `b`");
}

#[test]
fn join_without_root_is_error() {
    let mut state = QueryState::new();
    state
        .tables
        .push(TableRef::join("class", None, "x = y", JoinType::Inner));
    assert!(select(&state).unwrap_err().is_render());
}

#[test]
fn missing_table_is_error() {
    let state = QueryState::new();
    assert!(select(&state).unwrap_err().is_render());
    assert!(delete(&state).unwrap_err().is_render());
}

#[test]
fn malformed_aggregate_is_error() {
    let mut state = state_from("user", None);
    state.havings.push(Condition::compare("SUM(score", ">", 1));
    assert!(select(&state).unwrap_err().is_render());
}

#[test]
fn unsupported_operator_is_error() {
    let mut state = state_from("user", None);
    state.wheres.push(Condition::compare("id", "= 1 OR 1 =", 1));
    assert!(select(&state).unwrap_err().is_render());
}

#[test]
fn count_default_and_field() {
    let mut state = state_from("user", None);
    state.wheres.push(Condition::compare("age", ">", 18));
    state.limit = Some(3);
    state.orders.push(Order::new("id", Some(Direction::Asc)));

    let stmt = count(&state, None).unwrap();
    assert_eq!(stmt.sql, "SELECT COUNT(*) FROM `user` WHERE `age` > ?");
    assert_eq!(stmt.params.len(), 1);

    let stmt = count(&state, Some("u.id")).unwrap();
    assert_eq!(stmt.sql, "SELECT COUNT(`u`.`id`) FROM `user` WHERE `age` > ?");
}

#[test]
fn insert_missing_field_renders_null() {
    let state = state_from("user", None);
    let rows = vec![
        row(&[("name", Value::from("apple")), ("age", Value::Int(12))]),
        row(&[("name", Value::from("king"))]),
    ];

    let stmt = insert(&state, &["name", "age", "class_id"], &rows).unwrap();
    assert_eq!(
        stmt.sql,
        "INSERT INTO `user` (`name`, `age`, `class_id`) VALUES (?, ?, NULL), (?, NULL, NULL)"
    );
    assert_eq!(
        stmt.params,
        vec![Value::from("apple"), Value::Int(12), Value::from("king")]
    );
}

#[test]
fn insert_explicit_null_binds_nothing() {
    let state = state_from("user", None);
    let rows = vec![row(&[("name", Value::from("x")), ("age", Value::Null)])];
    let stmt = insert(&state, &["name", "age"], &rows).unwrap();
    assert_eq!(stmt.sql, "INSERT INTO `user` (`name`, `age`) VALUES (?, NULL)");
    assert_eq!(stmt.params.len(), 1);
}

#[test]
fn insert_ignores_alias_and_joins() {
    let mut state = state_from("user", Some("u"));
    state
        .tables
        .push(TableRef::join("class", None, "a = b", JoinType::Inner));
    let rows = vec![row(&[("name", Value::from("x"))])];
    let stmt = insert(&state, &["name"], &rows).unwrap();
    assert_eq!(stmt.sql, "INSERT INTO `user` (`name`) VALUES (?)");
}

#[test]
fn insert_rejects_empty_input() {
    let state = state_from("user", None);
    let empty_fields: [&str; 0] = [];
    assert!(insert(&state, &empty_fields, &[InsertRow::new()]).is_err());
    assert!(insert(&state, &["name"], &[]).is_err());
}

#[test]
fn insert_select_prefixes_target() {
    let state = state_from("user_bak", None);
    let stmt = insert_select(&state, "SELECT * FROM user").unwrap();
    assert_eq!(stmt.sql, "INSERT INTO `user_bak` SELECT * FROM user");
    assert!(stmt.params.is_empty());
}

#[test]
fn update_binds_set_before_where() {
    let mut state = state_from("user", None);
    state.wheres.push(Condition::compare("id", "=", 7));
    state.orders.push(Order::new("id", Some(Direction::Desc)));
    state.limit = Some(1);

    let stmt = update(
        &state,
        &[
            ("name".to_string(), Value::from("Aaron")),
            ("u.age".to_string(), Value::Int(30)),
        ],
    )
    .unwrap();
    assert_eq!(
        stmt.sql,
        "UPDATE `user` SET `name` = ?, `u`.`age` = ? WHERE `id` = ? ORDER BY `id` DESC LIMIT 1"
    );
    assert_eq!(
        stmt.params,
        vec![Value::from("Aaron"), Value::Int(30), Value::Int(7)]
    );
}

#[test]
fn update_requires_assignments() {
    let state = state_from("user", None);
    assert!(update(&state, &[]).unwrap_err().is_render());
}

#[test]
fn delete_only_uses_tables_and_where() {
    let mut state = state_from("user", None);
    state.wheres.push(Condition::compare("id", "=", 1));
    state.orders.push(Order::new("id", Some(Direction::Asc)));
    state.limit = Some(9);

    let stmt = delete(&state).unwrap();
    assert_eq!(stmt.sql, "DELETE FROM `user` WHERE `id` = ?");
    assert_eq!(stmt.params, vec![Value::Int(1)]);
}

#[test]
fn placeholder_count_ignores_quoted_text() {
    let stmt = Statement::raw("SELECT '?' FROM t WHERE a = ? AND b = `?`");
    assert_eq!(stmt.placeholder_count(), 1);
    assert!(stmt.check_arity().unwrap_err().is_render());
    assert!(Statement::with_params("SELECT '?' FROM t WHERE a = ?", vec![Value::Int(1)])
        .check_arity()
        .is_ok());
}

#[test]
fn debug_sql_substitutes_values() {
    let mut state = state_from("user", None);
    state.wheres.push(Condition::compare("name", "=", "O'Brien"));
    let stmt = select(&state).unwrap();
    assert_eq!(
        stmt.to_debug_sql(),
        r"SELECT * FROM `user` WHERE `name` = 'O\'Brien'"
    );
    // Diagnostics never touch the bound values.
    assert_eq!(stmt.params, vec![Value::from("O'Brien")]);
}
