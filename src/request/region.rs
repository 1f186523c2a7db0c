//! Region catalogue for crawl requests
//!
//! Regions are the 47 Japanese prefectures, in the conventional north-to-south order.
use crate::{RequestError, RequestResult};
use serde::Serialize;
use std::fmt;

/// All prefectures accepted by the job service
pub static PREFECTURES: [&str; 47] = [
    "北海道",
    "青森県",
    "岩手県",
    "宮城県",
    "秋田県",
    "山形県",
    "福島県",
    "茨城県",
    "栃木県",
    "群馬県",
    "埼玉県",
    "千葉県",
    "東京都",
    "神奈川県",
    "新潟県",
    "富山県",
    "石川県",
    "福井県",
    "山梨県",
    "長野県",
    "岐阜県",
    "静岡県",
    "愛知県",
    "三重県",
    "滋賀県",
    "京都府",
    "大阪府",
    "兵庫県",
    "奈良県",
    "和歌山県",
    "鳥取県",
    "島根県",
    "岡山県",
    "広島県",
    "山口県",
    "徳島県",
    "香川県",
    "愛媛県",
    "高知県",
    "福岡県",
    "佐賀県",
    "長崎県",
    "熊本県",
    "大分県",
    "宮崎県",
    "鹿児島県",
    "沖縄県",
];

/// A prefecture from the catalogue
///
/// Only constructible through [`Region::parse`] or [`Region::all`], so every
/// value is a name the job service understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Region(&'static str);

impl Region {
    /// Looks up a region by its exact name
    ///
    /// Surrounding whitespace is ignored.
    pub fn parse(name: &str) -> RequestResult<Self> {
        let name = name.trim();
        PREFECTURES
            .iter()
            .find(|p| **p == name)
            .map(|p| Self(*p))
            .ok_or_else(|| RequestError::UnknownRegion(name.to_string()))
    }

    /// Returns all regions in catalogue order
    pub fn all() -> impl Iterator<Item = Region> {
        PREFECTURES.iter().map(|p| Region(*p))
    }

    pub fn name(&self) -> &'static str {
        self.0
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}
