//! Shared fixtures for strata-db integration tests.

use std::path::Path;
use std::sync::Arc;
use strata_db::Database;
use tempfile::TempDir;

/// A temporary project directory with helpers to lay out content.
pub struct TestProject {
    dir: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, rel: &str, content: &str) -> &Self {
        self.write_bytes(rel, content.as_bytes())
    }

    pub fn write_bytes(&self, rel: &str, content: &[u8]) -> &Self {
        let path = self.dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
        self
    }

    pub fn db(&self) -> Arc<Database> {
        Arc::new(Database::open(self.dir.path().to_path_buf()).unwrap())
    }
}

/// A minimal PNG header carrying the given dimensions.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 2, 0, 0, 0]);
    bytes
}

/// A blog-shaped project most tests share: a root page, a blog with
/// dated posts (one hidden), an about page, and two root attachments.
pub fn blog_project() -> TestProject {
    let project = TestProject::new();
    project
        .write(
            "models/blog.toml",
            "[children]\nmodel = \"blog-post\"\norder_by = [\"-pub_date\"]\n",
        )
        .write(
            "models/blog-post.toml",
            concat!(
                "label = \"{title}\"\n",
                "parent = \"blog\"\n",
                "\n",
                "[[fields]]\n",
                "name = \"pub_date\"\n",
                "type = \"string\"\n",
                "\n",
                "[[fields]]\n",
                "name = \"featured\"\n",
                "type = \"bool\"\n",
            ),
        )
        .write("content/contents.str", "title: Home\n")
        .write("content/blog/contents.str", "_model: blog\ntitle: Blog\n")
        .write(
            "content/blog/first/contents.str",
            "title: First Post\n---\npub_date: 2024-01-01\n---\nfeatured: yes\n",
        )
        .write(
            "content/blog/second/contents.str",
            "title: Second Post\n---\npub_date: 2024-02-01\n",
        )
        .write(
            "content/blog/hidden-post/contents.str",
            "title: Secret\n---\n_hidden: yes\n---\npub_date: 2024-03-01\n",
        )
        .write("content/about/contents.str", "title: About\n")
        .write_bytes("content/photo.png", &png_bytes(640, 480))
        .write("content/photo.png.str", "caption: A photo\n")
        .write("content/notes.txt", "plain text");
    project
}
