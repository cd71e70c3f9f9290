//! Parses REPL input into a [`Statement`] and executes it against a
//! [`Table`].

use crate::cursor::Cursor;
use crate::error::{ExecError, ExecuteError, PrepareError};
use crate::node::{InternalNode, Node};
use crate::row::{Row, EMAIL_MAX_LEN, USERNAME_MAX_LEN};
use crate::table::Table;

pub enum Statement {
    Select,
    Insert(Row),
}

/// Parses one line of input into a [`Statement`]. Recognizes `select` and
/// `insert <id> <username> <email>`; anything else is a syntax error.
pub fn prepare_statement(input: &str) -> Result<Statement, PrepareError> {
    if input == "select" {
        return Ok(Statement::Select);
    }
    if let Some(rest) = input.strip_prefix("insert") {
        return Ok(Statement::Insert(prepare_insert(rest)?));
    }
    Err(PrepareError::UnrecognizedStatement(input.to_owned()))
}

fn prepare_insert(args: &str) -> Result<Row, PrepareError> {
    let fields: Vec<&str> = args.split_whitespace().collect();
    let [id_str, username, email] = fields[..] else {
        return Err(PrepareError::SyntaxError);
    };

    let id: i64 = id_str.parse().map_err(|_| PrepareError::SyntaxError)?;
    if id < 0 {
        return Err(PrepareError::InvalidId);
    }

    if username.len() > USERNAME_MAX_LEN || email.len() > EMAIL_MAX_LEN {
        return Err(PrepareError::StringTooLong);
    }

    Ok(Row::new(id as u32, username, email))
}

pub fn execute_statement(statement: Statement, table: &mut Table) -> Result<(), ExecError> {
    match statement {
        Statement::Select => execute_select(table),
        Statement::Insert(row) => execute_insert(row, table),
    }
}

/// Prints every row in the table in ascending key order.
///
/// [`Cursor::advance`] is deliberately scoped to a single leaf, so this
/// walks the tree structurally: descend into each child of an internal
/// node in order, and scan each leaf found along the way start to finish.
fn execute_select(table: &mut Table) -> Result<(), ExecError> {
    select_subtree(table, table.root_page_num)?;
    Ok(())
}

fn select_subtree(table: &mut Table, page_num: u32) -> Result<(), ExecError> {
    let is_leaf = {
        let page = table.pager.get_page(page_num)?;
        Node::from_page(page).is_leaf()
    };

    if is_leaf {
        let mut cursor = Cursor::at_leaf_start(table, page_num)?;
        while !cursor.end_of_table {
            let row = Row::deserialize(cursor.value()?);
            println!("{row}");
            cursor.advance()?;
        }
        return Ok(());
    }

    let num_children = {
        let page = table.pager.get_page(page_num)?;
        InternalNode::new(page).num_keys() + 1
    };
    for child_num in 0..num_children {
        let child_page_num = {
            let page = table.pager.get_page(page_num)?;
            InternalNode::new(page).child(child_num)
        };
        select_subtree(table, child_page_num)?;
    }
    Ok(())
}

fn execute_insert(row: Row, table: &mut Table) -> Result<(), ExecError> {
    let key_to_insert = row.id;
    let mut cursor = Cursor::find(table, key_to_insert)?;

    if !cursor.end_of_table {
        let existing = Row::deserialize(cursor.value()?);
        if existing.id == key_to_insert {
            return Err(ExecuteError::DuplicateKey.into());
        }
    }

    let mut buf = [0u8; crate::row::ROW_SIZE];
    row.serialize(&mut buf);
    cursor.insert(key_to_insert, &buf)?;
    Ok(())
}
