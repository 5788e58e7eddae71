use std::collections::HashMap;

use forum_types::models::Category;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::models::PostRow;
use crate::{Database, Result};

/// Restricts a post listing. Empty filter lists everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct PostFilter {
    pub category_id: Option<i64>,
    pub author_id: Option<i64>,
    /// Only posts this user currently likes.
    pub liked_by: Option<i64>,
}

// ?1 is always the viewer; counts are derived from post_reactions per row.
const POST_SELECT: &str = "
    SELECT p.id, p.title, p.content, p.user_id, u.username, p.created_at,
        (SELECT COUNT(*) FROM post_reactions r WHERE r.post_id = p.id AND r.value = 1),
        (SELECT COUNT(*) FROM post_reactions r WHERE r.post_id = p.id AND r.value = -1),
        (SELECT r.value FROM post_reactions r WHERE r.post_id = p.id AND r.user_id = ?1)
    FROM posts p
    JOIN users u ON u.id = p.user_id";

impl Database {
    /// Insert a post and its category links in one transaction.
    pub fn create_post(
        &self,
        title: &str,
        content: &str,
        author_id: i64,
        category_ids: &[i64],
    ) -> Result<i64> {
        self.transaction(|conn| {
            conn.execute(
                "INSERT INTO posts (title, content, user_id) VALUES (?1, ?2, ?3)",
                rusqlite::params![title, content, author_id],
            )?;
            let post_id = conn.last_insert_rowid();

            for category_id in category_ids {
                conn.execute(
                    "INSERT OR IGNORE INTO post_categories (post_id, category_id) VALUES (?1, ?2)",
                    [post_id, *category_id],
                )?;
            }

            Ok(post_id)
        })
    }

    pub fn get_post(&self, id: i64, viewer_id: Option<i64>) -> Result<Option<PostRow>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("{POST_SELECT} WHERE p.id = ?2"),
                    rusqlite::params![viewer_id, id],
                    map_post,
                )
                .optional()?;

            let Some(mut post) = row else {
                return Ok(None);
            };
            post.categories = categories_for_posts(conn, &[post.id])?
                .remove(&post.id)
                .unwrap_or_default();
            Ok(Some(post))
        })
    }

    /// Newest first.
    pub fn list_posts(&self, filter: PostFilter, viewer_id: Option<i64>) -> Result<Vec<PostRow>> {
        let mut params: Vec<Value> = vec![viewer_id.into()];
        let mut clauses: Vec<String> = Vec::new();

        if let Some(category_id) = filter.category_id {
            params.push(category_id.into());
            clauses.push(format!(
                "p.id IN (SELECT post_id FROM post_categories WHERE category_id = ?{})",
                params.len()
            ));
        }
        if let Some(author_id) = filter.author_id {
            params.push(author_id.into());
            clauses.push(format!("p.user_id = ?{}", params.len()));
        }
        if let Some(liked_by) = filter.liked_by {
            params.push(liked_by.into());
            clauses.push(format!(
                "p.id IN (SELECT post_id FROM post_reactions WHERE user_id = ?{} AND value = 1)",
                params.len()
            ));
        }

        let mut sql = POST_SELECT.to_string();
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY p.created_at DESC, p.id DESC");

        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let mut posts = stmt
                .query_map(rusqlite::params_from_iter(params.iter()), map_post)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            let ids: Vec<i64> = posts.iter().map(|p| p.id).collect();
            let mut categories = categories_for_posts(conn, &ids)?;
            for post in &mut posts {
                post.categories = categories.remove(&post.id).unwrap_or_default();
            }

            Ok(posts)
        })
    }
}

fn map_post(row: &Row<'_>) -> rusqlite::Result<PostRow> {
    Ok(PostRow {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        author_id: row.get(3)?,
        author_username: row.get(4)?,
        created_at: row.get(5)?,
        likes: row.get(6)?,
        dislikes: row.get(7)?,
        user_reaction: row.get(8)?,
        categories: Vec::new(),
    })
}

/// Post ids bound per category lookup; keeps each statement well under
/// SQLite's host parameter limit.
const CATEGORY_LOOKUP_CHUNK: usize = 500;

/// Batch-fetch categories for a set of posts, keyed by post id.
fn categories_for_posts(conn: &Connection, post_ids: &[i64]) -> Result<HashMap<i64, Vec<Category>>> {
    let mut by_post: HashMap<i64, Vec<Category>> = HashMap::new();

    for chunk in post_ids.chunks(CATEGORY_LOOKUP_CHUNK) {
        let placeholders: Vec<String> = (1..=chunk.len()).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "SELECT pc.post_id, c.id, c.name
             FROM post_categories pc
             JOIN categories c ON c.id = pc.category_id
             WHERE pc.post_id IN ({})
             ORDER BY c.name ASC",
            placeholders.join(", ")
        );

        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(chunk.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                Category {
                    id: row.get(1)?,
                    name: row.get(2)?,
                },
            ))
        })?;

        for row in rows {
            let (post_id, category) = row?;
            by_post.entry(post_id).or_default().push(category);
        }
    }

    Ok(by_post)
}
