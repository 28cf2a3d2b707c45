use std::sync::LazyLock;

/// Git metadata captured by the build script.
pub struct BuildInfo {
    pub commit_sha1: Option<&'static str>,
    pub branch: Option<&'static str>,
    pub git_dirty: bool,
}

pub static BUILD_INFO: LazyLock<BuildInfo> = LazyLock::new(|| BuildInfo {
    commit_sha1: option_env!("VERGEN_GIT_SHA"),
    branch: option_env!("VERGEN_GIT_BRANCH"),
    git_dirty: option_env!("VERGEN_GIT_DIRTY") == Some("true"),
});
