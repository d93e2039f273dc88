use school_directory::db::{self, NewSchool};

// Runs in its own binary: `CONFIG` and the store are process-wide.
#[test]
fn global_store_connects_once_from_environment() {
    figment::Jail::expect_with(|jail| {
        let path = jail.directory().join("global.db");
        jail.set_env(
            "SCHOOLS_DATABASE__URL",
            format!("sqlite://{}?mode=rwc", path.display()),
        );

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| e.to_string())?;
        rt.block_on(async {
            let first = db::global().await.expect("first init");
            let second = db::global().await.expect("second call");
            assert!(std::ptr::eq(first, second));

            let id = first
                .insert(NewSchool {
                    name: "Lincoln High".to_string(),
                    ..NewSchool::default()
                })
                .await
                .expect("insert");
            let rows = second.list().await.expect("list");
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].id, id);
        });

        assert!(path.exists(), "pool should open the configured file");
        Ok(())
    });
}
