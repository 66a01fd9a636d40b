//! Tests for SummaryService
//!
//! Tests cover:
//! - Reply counts and the newest-first recent reply window
//! - Newest-root-first ordering across trees
//! - Author name resolution
//! - Paged summaries
//! - Insertion order deciding ties between equal timestamps

#[cfg(test)]
mod tests {
    use crate::db::{DatabaseService, NodeStore, TursoStore};
    use crate::models::{Node, Operator};
    use crate::services::{NodeService, SummaryService, UserService, PAGE_SIZE_LIMIT};
    use std::sync::Arc;
    use tempfile::TempDir;

    struct TestServices {
        store: Arc<dyn NodeStore>,
        nodes: NodeService,
        users: UserService,
        summaries: SummaryService,
        _temp: TempDir,
    }

    async fn create_test_services() -> TestServices {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let db = Arc::new(DatabaseService::new(db_path).await.unwrap());
        let store: Arc<dyn NodeStore> = Arc::new(TursoStore::new(db));

        TestServices {
            nodes: NodeService::new(store.clone()),
            users: UserService::new(store.clone()),
            summaries: SummaryService::new(store.clone()).with_max_page_size(2),
            store,
            _temp: temp_dir,
        }
    }

    #[tokio::test]
    async fn test_reply_count_and_recent_replies() {
        let s = create_test_services().await;
        let root = s.nodes.create_root("user1", 1.0).await.unwrap();

        let mut replies = Vec::new();
        for i in 1..=5 {
            let reply = s
                .nodes
                .create_reply("user2", &root.id, "+", i as f64)
                .await
                .unwrap();
            replies.push(reply);
        }

        let summaries = s.summaries.summarize().await.unwrap();
        assert_eq!(summaries.len(), 1);

        let summary = &summaries[0];
        assert_eq!(summary.tree_id(), root.id);
        assert_eq!(summary.value(), 1.0);
        assert_eq!(summary.reply_count, 5);

        let recent: Vec<&str> = summary
            .recent_replies
            .iter()
            .map(|n| n.id.as_str())
            .collect();
        assert_eq!(
            recent,
            vec![
                replies[4].id.as_str(),
                replies[3].id.as_str(),
                replies[2].id.as_str()
            ]
        );
    }

    #[tokio::test]
    async fn test_trees_newest_first_with_authors() {
        let s = create_test_services().await;
        let alice = s.users.register("alice", "alice-pw").await.unwrap();

        let older = s.nodes.create_root(&alice.id, 1.0).await.unwrap();
        let newer = s.nodes.create_root("unregistered", 2.0).await.unwrap();
        s.nodes
            .create_reply(&alice.id, &older.id, "*", 2.0)
            .await
            .unwrap();

        let summaries = s.summaries.summarize().await.unwrap();
        assert_eq!(summaries.len(), 2);

        assert_eq!(summaries[0].tree_id(), newer.id);
        assert_eq!(summaries[0].reply_count, 0);
        assert!(summaries[0].recent_replies.is_empty());
        assert_eq!(summaries[0].author_username, None);

        assert_eq!(summaries[1].tree_id(), older.id);
        assert_eq!(summaries[1].reply_count, 1);
        assert_eq!(summaries[1].author_username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_summarize_page() {
        let s = create_test_services().await;

        let mut roots = Vec::new();
        for i in 0..3 {
            roots.push(s.nodes.create_root("u", i as f64).await.unwrap());
        }
        s.nodes
            .create_reply("u", &roots[0].id, "-", 1.0)
            .await
            .unwrap();

        // Limit is capped at the configured page size
        let first = s.summaries.summarize_page(0, 10).await.unwrap();
        let ids: Vec<&str> = first.iter().map(|t| t.tree_id()).collect();
        assert_eq!(ids, vec![roots[2].id.as_str(), roots[1].id.as_str()]);

        let second = s.summaries.summarize_page(2, 2).await.unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0].tree_id(), roots[0].id);
        assert_eq!(second[0].reply_count, 1);

        assert!(s.summaries.summarize_page(3, 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_store() {
        let s = create_test_services().await;
        assert!(s.summaries.summarize().await.unwrap().is_empty());
        assert!(s.summaries.summarize_page(0, 5).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_recent_replies_tie_break_on_equal_timestamps() {
        let s = create_test_services().await;

        let root = Node::new_root("user1".to_string(), 1.0);
        s.store.insert_node(&root).await.unwrap();

        let mut replies = Vec::new();
        for i in 1..=5 {
            let mut reply =
                Node::new_reply(&root, "user2".to_string(), Operator::Add, i as f64).unwrap();
            reply.created_at = root.created_at;
            s.store.insert_node(&reply).await.unwrap();
            replies.push(reply);
        }

        // Repeated runs must agree: the later insertion counts as newer
        for _ in 0..3 {
            let summaries = s.summaries.summarize().await.unwrap();
            assert_eq!(summaries[0].reply_count, 5);

            let recent: Vec<&str> = summaries[0]
                .recent_replies
                .iter()
                .map(|n| n.id.as_str())
                .collect();
            assert_eq!(
                recent,
                vec![
                    replies[4].id.as_str(),
                    replies[3].id.as_str(),
                    replies[2].id.as_str()
                ]
            );
        }
    }

    #[tokio::test]
    async fn test_root_tie_break_on_equal_timestamps() {
        let s = create_test_services().await;

        let first = Node::new_root("u".to_string(), 1.0);
        let mut second = Node::new_root("u".to_string(), 2.0);
        second.created_at = first.created_at;
        s.store.insert_node(&first).await.unwrap();
        s.store.insert_node(&second).await.unwrap();

        let all: Vec<String> = s
            .summaries
            .summarize()
            .await
            .unwrap()
            .iter()
            .map(|t| t.tree_id().to_string())
            .collect();
        assert_eq!(all, vec![second.id.clone(), first.id.clone()]);

        let page: Vec<String> = s
            .summaries
            .summarize_page(0, 2)
            .await
            .unwrap()
            .iter()
            .map(|t| t.tree_id().to_string())
            .collect();
        assert_eq!(page, all);
    }

    #[tokio::test]
    async fn test_max_page_size_is_bounded() {
        let s = create_test_services().await;
        assert_eq!(s.summaries.max_page_size(), 2);

        let unbounded = SummaryService::new(s.store.clone()).with_max_page_size(u64::MAX);
        assert_eq!(unbounded.max_page_size(), PAGE_SIZE_LIMIT);

        let zero = SummaryService::new(s.store.clone()).with_max_page_size(0);
        assert_eq!(zero.max_page_size(), 1);
    }
}
