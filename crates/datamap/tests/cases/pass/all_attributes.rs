// SPDX-FileCopyrightText: 2025-2026 RAprogramm <andrey.rozanov.vl@gmail.com>
// SPDX-License-Identifier: MIT

use datamap::{DescriptorRegistry, Entity, RegistryExt};

#[derive(Default)]
pub struct Cache {
    pub entries: Vec<String>
}

#[derive(Entity, Default)]
#[entity(table = "posts", schema = "blog", default)]
pub struct Post {
    #[id]
    pub post_id: i64,

    #[column(name = "post_title")]
    #[display(name = "Title", description = "Headline", group = "Content")]
    pub title: String,

    #[column]
    pub body: String,

    #[foreign_key(references = "users")]
    pub author_id: i64,

    views: u64,

    #[not_mapped]
    pub cache: Cache,

    pub r#type: String
}

fn main() {
    let registry = DescriptorRegistry::new();
    let post = registry.describe::<Post>().unwrap();
    assert_eq!(post.schema(), Some("blog"));
    assert_eq!(post.require_member("title").unwrap().column(), "post_title");
    assert!(post.member("type").is_some());
    assert!(post.member("views").is_some());
    assert!(post.has_default_constructor());
}
