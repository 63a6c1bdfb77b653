//! Concurrent Mutation Tests
//!
//! Overlapping structural changes are serialized by the store's write lock
//! (`BEGIN IMMEDIATE` plus busy timeout). Whatever order they commit in,
//! every committed state must satisfy the path invariant.

#[cfg(test)]
mod concurrent_mutation_tests {
    use nodepath_core::db::DomainEvent;
    use nodepath_core::{CreateNodeParams, Node, TreeConfig, TreeService};
    use tempfile::TempDir;

    async fn create_test_service() -> (TreeService, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = TreeConfig::with_database_path(temp_dir.path().join("concurrent.db"));
        let service = TreeService::open(&config).await.unwrap();
        (service, temp_dir)
    }

    async fn category(service: &TreeService, code: &str, parent: Option<&Node>) -> Node {
        let params = match parent {
            Some(parent) => CreateNodeParams::child(code, "", &parent.id),
            None => CreateNodeParams::root(code, ""),
        };
        service.create_node(params).await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_rename_and_move_race() {
        let (service, _temp) = create_test_service().await;

        let top = category(&service, "top", None).await;
        let science = category(&service, "science", Some(&top)).await;
        let biology = category(&service, "biology", Some(&science)).await;
        category(&service, "genetics", Some(&biology)).await;
        let sport = category(&service, "sport", Some(&top)).await;

        let renamer = {
            let service = service.clone();
            let id = science.id.clone();
            tokio::spawn(async move { service.rename_node(&id, "magic").await })
        };
        let mover = {
            let service = service.clone();
            let id = biology.id.clone();
            let parent = sport.id.clone();
            tokio::spawn(async move { service.move_node(&id, Some(&parent)).await })
        };

        renamer.await.unwrap().unwrap();
        mover.await.unwrap().unwrap();

        assert!(service.verify_integrity().await.unwrap().is_empty());

        let genetics = service.get_node_by_key("genetics").await.unwrap().unwrap();
        assert_eq!(genetics.path, "top.sport.biology.genetics");
        let science = service.get_node(&science.id).await.unwrap().unwrap();
        assert_eq!(science.path, "top.magic");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_opposing_moves_never_form_a_cycle() {
        let (service, _temp) = create_test_service().await;

        let a = category(&service, "a", None).await;
        let b = category(&service, "b", None).await;

        // a under b and b under a: at most one can win
        let first = {
            let service = service.clone();
            let (id, parent) = (a.id.clone(), b.id.clone());
            tokio::spawn(async move { service.move_node(&id, Some(&parent)).await })
        };
        let second = {
            let service = service.clone();
            let (id, parent) = (b.id.clone(), a.id.clone());
            tokio::spawn(async move { service.move_node(&id, Some(&parent)).await })
        };

        let results = [first.await.unwrap(), second.await.unwrap()];
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);

        assert!(service.verify_integrity().await.unwrap().is_empty());
        assert_eq!(service.get_roots().await.unwrap().len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_parallel_creates_under_one_parent() {
        let (service, _temp) = create_test_service().await;
        let top = category(&service, "top", None).await;
        let mut events = service.subscribe();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let service = service.clone();
                let parent = top.id.clone();
                tokio::spawn(async move {
                    service
                        .create_node(CreateNodeParams::child(format!("child_{}", i), "", parent))
                        .await
                })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(service.get_children(&top.id).await.unwrap().len(), 8);
        for _ in 0..8 {
            let event = events.recv().await.unwrap();
            assert!(matches!(event, DomainEvent::NodeCreated { .. }));
        }
        assert!(service.verify_integrity().await.unwrap().is_empty());
    }
}
