//! 文件命名单元测试
//!
//! 覆盖命名标记解析、回退规则与路径段清洗

use aweme_harvester::models::{AwemeItem, NamingToken};
use aweme_harvester::utils::file_namer::{
    file_name, image_file_name, photo_folder_name, sanitize_description, EMPTY_DESCRIPTION,
    MAX_COMPONENT_CHARS,
};

fn item(id: &str) -> AwemeItem {
    AwemeItem::video(id, "https://cdn.test/v.mp4")
}

#[test]
fn test_position_is_one_based() {
    let name = file_name(
        &item("123"),
        4,
        "mp4",
        &[NamingToken::NumericalOrder, NamingToken::Id],
    );
    assert_eq!(name, "5_123.mp4");
}

#[test]
fn test_no_tokens_uses_id() {
    assert_eq!(file_name(&item("123"), 0, "jpg", &[]), "123.jpg");
}

#[test]
fn test_timestamp_is_raw_epoch_seconds() {
    let item = item("9").with_created_at(1_712_345_678);
    assert_eq!(
        file_name(&item, 0, "mp4", &[NamingToken::Timestamp]),
        "1712345678.mp4"
    );
}

#[test]
fn test_empty_description_uses_placeholder() {
    let item = item("9").with_description("   ");
    assert_eq!(
        file_name(&item, 0, "mp4", &[NamingToken::Description]),
        format!("{}.mp4", EMPTY_DESCRIPTION)
    );
}

#[test]
fn test_description_with_path_separators_stays_one_component() {
    let item = item("9").with_description("../etc/passwd \\ win:dows");
    let name = file_name(&item, 2, "mp4", &[NamingToken::NumericalOrder, NamingToken::Description]);

    assert!(!name.contains('/'));
    assert!(!name.contains('\\'));
    assert!(!name.contains(':'));
    assert!(name.starts_with("3_"));
}

#[test]
fn test_description_is_capped() {
    let long = "测".repeat(MAX_COMPONENT_CHARS * 2);
    let sanitized = sanitize_description(&long);
    assert_eq!(sanitized.chars().count(), MAX_COMPONENT_CHARS);
}

#[test]
fn test_description_only_dots_uses_placeholder() {
    assert_eq!(sanitize_description(".."), EMPTY_DESCRIPTION);
}

#[test]
fn test_photo_folder_and_images() {
    let photo = AwemeItem::photo("55", vec!["a".into(), "b".into(), "c".into()]);
    let folder = photo_folder_name(&photo, 1, &[NamingToken::NumericalOrder, NamingToken::Id]);

    assert_eq!(folder, "2_55");
    let names: Vec<String> = (0..photo.image_count()).map(image_file_name).collect();
    assert_eq!(names, vec!["1.jpg", "2.jpg", "3.jpg"]);
}

#[test]
fn test_photo_folder_without_tokens_is_id() {
    let photo = AwemeItem::photo("55", vec!["a".into()]);
    assert_eq!(photo_folder_name(&photo, 0, &[]), "55");
}
