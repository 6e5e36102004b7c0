//! Run configuration: where the project lives and where archives come from.

use anyhow::Result;
use log::debug;
use reqwest::Client;
use std::path::{Component, Path, PathBuf};

use crate::download::DEFAULT_BASE_URL;
use crate::error::ToolchainError;
use crate::http::HttpClient;
use crate::platform::PlatformIdentifier;
use crate::runtime::Runtime;

/// Name of the folder the tool runs from.
pub const TOOL_DIR_NAME: &str = "Java";

/// Name of the project folder, both as the tool folder's parent and as the
/// sibling holding `src/` and `lib/`.
pub const PROJECT_DIR_NAME: &str = "CROSS";

/// Archives smaller than this are placeholders, not real compiler distributions.
pub const MIN_ARCHIVE_SIZE: u64 = 100 * 1024;

/// Project-relative paths, all derived from the tool directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    tool_dir: PathBuf,
    root: PathBuf,
}

impl Layout {
    pub fn new(tool_dir: impl Into<PathBuf>) -> Self {
        let tool_dir = tool_dir.into();
        let root = tool_dir
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| tool_dir.join(".."));
        Self { tool_dir, root }
    }

    /// The tool must be run from `<PROJECT>/<TOOL>`.
    pub fn check(&self) -> Result<(), ToolchainError> {
        let name_of = |p: &Path| p.file_name().map(|n| n.to_string_lossy().into_owned());
        let ok = name_of(&self.tool_dir).as_deref() == Some(TOOL_DIR_NAME)
            && name_of(&self.root).as_deref() == Some(PROJECT_DIR_NAME);
        if ok {
            Ok(())
        } else {
            Err(ToolchainError::WrongWorkingDirectory {
                cwd: self.tool_dir.clone(),
                expected: format!("{}/{}", PROJECT_DIR_NAME, TOOL_DIR_NAME),
            })
        }
    }

    pub fn tool_dir(&self) -> &Path {
        &self.tool_dir
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.tool_dir.join("Versions")
    }

    pub fn archive_path(&self, platform: &PlatformIdentifier) -> PathBuf {
        self.versions_dir().join(platform.archive_name())
    }

    /// Extraction target, removed during cleanup.
    pub fn scratch_dir(&self) -> PathBuf {
        self.tool_dir.join("Unzipped")
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root.join(PROJECT_DIR_NAME)
    }

    pub fn source_dir(&self) -> PathBuf {
        self.project_dir().join("src")
    }

    pub fn lib_dir(&self) -> PathBuf {
        self.project_dir().join("lib")
    }

    /// Wildcard classpath entry covering every jar in the library directory.
    pub fn lib_classpath(&self) -> String {
        self.lib_dir().join("*").to_string_lossy().into_owned()
    }

    /// Compiled class output.
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("bin")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("DB")
    }
}

/// Explicit settings threaded through every step of a run.
#[derive(Debug, Clone)]
pub struct Config {
    pub layout: Layout,
    pub base_url: String,
}

impl Config {
    /// Resolve settings; `project_dir` defaults to the current directory.
    pub fn new<R: Runtime>(
        runtime: &R,
        project_dir: Option<PathBuf>,
        base_url: Option<String>,
    ) -> Result<Self> {
        let tool_dir = match project_dir {
            Some(path) if path.is_absolute() => path,
            Some(path) => runtime.current_dir()?.join(path),
            None => runtime.current_dir()?,
        };
        let tool_dir = normalize(&tool_dir);
        let base_url = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        debug!("Tool directory {:?}, base URL {}", tool_dir, base_url);

        Ok(Self {
            layout: Layout::new(tool_dir),
            base_url,
        })
    }

    pub fn http_client(&self) -> Result<HttpClient> {
        let client = Client::builder()
            .user_agent(concat!("jdkrun/", env!("JDKRUN_VERSION")))
            .build()?;
        Ok(HttpClient::new(client))
    }
}

/// Lexically resolve `.` and `..` so the directory names can be checked.
fn normalize(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{Arch, OsFamily};
    use crate::runtime::MockRuntime;
    use mockito::{Matcher, Server};

    fn layout() -> Layout {
        Layout::new("/home/user/CROSS/Java")
    }

    #[test]
    fn test_layout_paths() {
        let layout = layout();
        let platform = PlatformIdentifier::new(OsFamily::Linux, Arch::X64).unwrap();

        assert_eq!(layout.root(), Path::new("/home/user/CROSS"));
        assert_eq!(
            layout.archive_path(&platform),
            PathBuf::from("/home/user/CROSS/Java/Versions/Linux_x64.zip")
        );
        assert_eq!(
            layout.scratch_dir(),
            PathBuf::from("/home/user/CROSS/Java/Unzipped")
        );
        assert_eq!(
            layout.source_dir(),
            PathBuf::from("/home/user/CROSS/CROSS/src")
        );
        assert_eq!(layout.output_dir(), PathBuf::from("/home/user/CROSS/bin"));
        assert_eq!(layout.data_dir(), PathBuf::from("/home/user/CROSS/DB"));
    }

    #[test]
    #[cfg(unix)]
    fn test_lib_classpath_is_wildcard() {
        assert_eq!(layout().lib_classpath(), "/home/user/CROSS/CROSS/lib/*");
    }

    #[test]
    fn test_layout_check() {
        assert!(layout().check().is_ok());

        let wrong_tool = Layout::new("/home/user/CROSS/Docs");
        assert!(matches!(
            wrong_tool.check(),
            Err(ToolchainError::WrongWorkingDirectory { .. })
        ));

        let wrong_parent = Layout::new("/home/user/other/Java");
        assert!(wrong_parent.check().is_err());
    }

    #[test]
    fn test_config_defaults_to_current_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/home/user/CROSS/Java")));

        let config = Config::new(&runtime, None, None).unwrap();

        assert_eq!(config.layout, layout());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    #[cfg(unix)]
    fn test_config_explicit_dir_skips_cwd() {
        let mut runtime = MockRuntime::new();
        runtime.expect_current_dir().never();

        let config = Config::new(
            &runtime,
            Some(PathBuf::from("/srv/CROSS/Java")),
            Some("http://localhost:8080/v".into()),
        )
        .unwrap();

        assert_eq!(config.layout.tool_dir(), Path::new("/srv/CROSS/Java"));
        assert_eq!(config.base_url, "http://localhost:8080/v");
    }

    #[test]
    #[cfg(unix)]
    fn test_config_resolves_relative_project_dir() {
        let cases = [
            ("/home/user/CROSS", "Java"),
            ("/home/user/CROSS/Java", "."),
            ("/home/user/CROSS/Java", "./"),
            ("/home/user/CROSS/Java", "../Java"),
            ("/home/user/CROSS/Java/Versions", ".."),
        ];
        for (cwd, relative) in cases {
            let mut runtime = MockRuntime::new();
            runtime
                .expect_current_dir()
                .returning(move || Ok(PathBuf::from(cwd)));

            let config = Config::new(&runtime, Some(PathBuf::from(relative)), None).unwrap();

            assert_eq!(config.layout, layout(), "{} from {}", relative, cwd);
            assert!(config.layout.check().is_ok(), "{} from {}", relative, cwd);
            assert_eq!(config.layout.root(), Path::new("/home/user/CROSS"));
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_config_normalizes_absolute_project_dir() {
        let mut runtime = MockRuntime::new();
        runtime.expect_current_dir().never();

        let config = Config::new(
            &runtime,
            Some(PathBuf::from("/home/user/CROSS/Java/Versions/../")),
            None,
        )
        .unwrap();

        assert_eq!(config.layout, layout());
    }

    #[tokio::test]
    async fn test_http_client_sends_user_agent() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/")
            .match_header("user-agent", Matcher::Regex("^jdkrun/".to_string()))
            .create_async()
            .await;

        let config = Config {
            layout: layout(),
            base_url: server.url(),
        };
        let client = config.http_client().unwrap();
        let _ = client.inner().get(server.url()).send().await;

        mock.assert_async().await;
    }
}
