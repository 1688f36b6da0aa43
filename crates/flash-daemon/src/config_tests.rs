use super::*;

#[test]
fn resize_filesystem_defaults_to_ext() {
    std::env::remove_var("FLASHD_RESIZE_FILESYSTEM");
    assert_eq!(resize_filesystem(), FilesystemKind::Ext);
}

#[test]
fn resize_filesystem_reads_btrfs_override() {
    std::env::set_var("FLASHD_RESIZE_FILESYSTEM", "btrfs");
    assert_eq!(resize_filesystem(), FilesystemKind::Btrfs);
    std::env::remove_var("FLASHD_RESIZE_FILESYSTEM");
}

#[test]
fn resize_filesystem_reads_none_override() {
    std::env::set_var("FLASHD_RESIZE_FILESYSTEM", "none");
    assert_eq!(resize_filesystem(), FilesystemKind::Unknown);
    std::env::remove_var("FLASHD_RESIZE_FILESYSTEM");
}

#[test]
fn state_dir_honors_explicit_override() {
    std::env::set_var("FLASHD_STATE_DIR", "/tmp/flashd-test-state");
    assert_eq!(state_dir(), PathBuf::from("/tmp/flashd-test-state"));
    std::env::remove_var("FLASHD_STATE_DIR");
}

#[test]
fn load_derives_log_path_under_state_dir() {
    std::env::set_var("FLASHD_STATE_DIR", "/tmp/flashd-test-state-2");
    let config = Config::load();
    assert_eq!(
        config.log_path,
        PathBuf::from("/tmp/flashd-test-state-2/flashd.log")
    );
    std::env::remove_var("FLASHD_STATE_DIR");
}
