use forum_types::models::Category;
use rusqlite::OptionalExtension;

use crate::{Database, Result};

impl Database {
    pub fn create_category(&self, name: &str) -> Result<i64> {
        self.with_conn_mut(|conn| {
            conn.execute("INSERT INTO categories (name) VALUES (?1)", [name])?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn category_exists(&self, name: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE name = ?1)",
                [name],
                |row| row.get(0),
            )?)
        })
    }

    /// Create any of `names` that are missing. Returns how many were added.
    pub fn ensure_categories(&self, names: &[&str]) -> Result<usize> {
        self.transaction(|conn| {
            let mut added = 0;
            for name in names {
                added += conn.execute("INSERT OR IGNORE INTO categories (name) VALUES (?1)", [name])?;
            }
            Ok(added)
        })
    }

    pub fn list_categories(&self) -> Result<Vec<Category>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id, name FROM categories ORDER BY name ASC")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row("SELECT id, name FROM categories WHERE id = ?1", [id], |row| {
                    Ok(Category {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                })
                .optional()?;
            Ok(row)
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::DbError;
    use crate::test_support::open_temp;

    #[test]
    fn duplicate_category_is_a_conflict() {
        let (_dir, db) = open_temp();
        db.create_category("Science").unwrap();

        let err = db.create_category("Science").unwrap_err();
        assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");
    }

    #[test]
    fn categories_list_sorted_by_name() {
        let (_dir, db) = open_temp();
        for name in ["Sports", "General", "Technology"] {
            db.create_category(name).unwrap();
        }

        let names: Vec<String> = db
            .list_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, ["General", "Sports", "Technology"]);
    }

    #[test]
    fn ensure_categories_is_idempotent() {
        let (_dir, db) = open_temp();
        db.create_category("General").unwrap();

        assert_eq!(db.ensure_categories(&["General", "Science"]).unwrap(), 1);
        assert_eq!(db.ensure_categories(&["General", "Science"]).unwrap(), 0);
        assert!(db.category_exists("Science").unwrap());
        assert!(!db.category_exists("Cooking").unwrap());
    }

    #[test]
    fn get_category_by_id() {
        let (_dir, db) = open_temp();
        let id = db.create_category("General").unwrap();

        assert_eq!(db.get_category(id).unwrap().unwrap().name, "General");
        assert!(db.get_category(9999).unwrap().is_none());
    }
}
