//! Shared utilities for integration tests.

use std::fs;
use std::path::{Path, PathBuf};

use auto_router::config::AutoRouterConfig;

/// A scratch directory removed on drop.
pub struct Workspace {
    pub root: PathBuf,
}

impl Workspace {
    pub fn new(tag: &str) -> Self {
        let root = std::env::temp_dir().join(format!("auto-router-{}-{}", tag, uuid::Uuid::new_v4()));
        fs::create_dir_all(root.join("modules")).unwrap();
        Self { root }
    }

    pub fn modules(&self) -> PathBuf {
        self.root.join("modules")
    }

    pub fn metrics_log(&self) -> PathBuf {
        self.root.join("logs").join("metrics.log")
    }

    #[allow(dead_code)]
    pub fn operational_log(&self) -> PathBuf {
        self.root.join("logs").join("autorouter.log")
    }

    /// Write a route module at `relative` under the modules directory.
    pub fn write_module(&self, relative: &str, content: &str) {
        let path = self.modules().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    /// Configuration pointing every path into this workspace.
    pub fn config(&self) -> AutoRouterConfig {
        let mut config = AutoRouterConfig::default();
        config.modules_path = path_str(&self.modules());
        config.metrics_log_path = path_str(&self.metrics_log());
        config.operational_log_path = path_str(&self.operational_log());
        config.listener.bind_address = "127.0.0.1:0".to_string();
        config
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        let _ = fs::remove_dir_all(&self.root);
    }
}

fn path_str(path: &Path) -> String {
    path.display().to_string()
}

/// Three valid modules in nested directories plus one broken one.
#[allow(dead_code)]
pub fn write_demo_modules(ws: &Workspace) {
    ws.write_module(
        "status.route.toml",
        r#"
        [[routes]]
        method = "GET"
        path = "/status"
        json = { status = "ok" }
        "#,
    );
    ws.write_module(
        "users/index.route.toml",
        r#"
        [[routes]]
        method = "GET"
        path = "/users/{id}"
        json = { success = true }

        [[routes]]
        method = "DELETE"
        path = "/users/{id}"
        status = 404
        json = { success = false }
        "#,
    );
    ws.write_module(
        "auth/login.route.toml",
        r#"
        [[routes]]
        method = "POST"
        path = "/auth/login"
        status = 401
        body = "invalid credentials"
        "#,
    );
    ws.write_module("broken.route.toml", "[[routes]\nmethod = ");
}
