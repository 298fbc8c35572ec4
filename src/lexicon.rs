//! Keyword lexicons: signed word weights plus modifier word lists per language.
//!
//! The built-in tables were tuned on anime and film reviews. Weights run from
//! -5 to 5; the "leaning" words (reflective or bleak vocabulary that is not
//! praise or criticism on its own) carry ±0.75.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Weight of words that only lean one way.
pub const LEANING_WEIGHT: f64 = 0.75;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMode {
    /// Plain substring search, for scripts without spaces between words.
    Substring,
    /// Case-insensitive match on word boundaries.
    WordBoundary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageLexicon {
    pub match_mode: MatchMode,
    pub weights: BTreeMap<String, f64>,
    #[serde(default)]
    pub intensifiers: Vec<String>,
    #[serde(default)]
    pub hedges: Vec<String>,
    #[serde(default)]
    pub negations: Vec<String>,
}

impl LanguageLexicon {
    pub fn new(match_mode: MatchMode) -> Self {
        Self {
            match_mode,
            weights: BTreeMap::new(),
            intensifiers: Vec::new(),
            hedges: Vec::new(),
            negations: Vec::new(),
        }
    }

    /// Add `words` at `weight`; words already present keep their weight.
    pub fn with_words(mut self, weight: f64, words: &[&str]) -> Self {
        for word in words {
            self.weights.entry(word.to_string()).or_insert(weight);
        }
        self
    }

    pub fn with_modifiers(mut self, intensifiers: &[&str], hedges: &[&str], negations: &[&str]) -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        self.intensifiers = owned(intensifiers);
        self.hedges = owned(hedges);
        self.negations = owned(negations);
        self
    }

    pub fn max_weight_magnitude(&self) -> f64 {
        self.weights.values().fold(0.0, |max, w| max.max(w.abs()))
    }
}

/// Read-only after construction; share it behind `&` or `Arc`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Lexicon {
    pub languages: BTreeMap<String, LanguageLexicon>,
}

impl Lexicon {
    pub fn language(&self, tag: &str) -> Option<&LanguageLexicon> {
        self.languages.get(tag)
    }

    pub fn insert(&mut self, tag: impl Into<String>, table: LanguageLexicon) {
        self.languages.insert(tag.into(), table);
    }

    /// Load a lexicon with the same shape as the serialized [`Lexicon`].
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Cannot read lexicon '{}'", path.display()))?;
        let lexicon: Lexicon = serde_json::from_str(&content)
            .with_context(|| format!("Invalid lexicon '{}'", path.display()))?;
        Ok(lexicon)
    }

    /// Chinese, English and Japanese review vocabulary.
    pub fn builtin() -> Self {
        let mut lexicon = Lexicon::default();

        lexicon.insert(
            "zh",
            LanguageLexicon::new(MatchMode::Substring)
                .with_words(5.0, &[
                    "神作", "巅峰", "完美", "史诗", "经典", "杰作", "封神", "震撼", "伟大", "不朽", "超越", "致敬",
                    "感动", "神",
                ])
                .with_words(4.0, &[
                    "精彩", "优秀", "深刻", "细腻", "惊艳", "燃", "热血", "牛逼", "厉害", "赞", "好评", "值得",
                    "推荐", "喜欢", "满分",
                ])
                .with_words(3.0, &["好看", "不错", "合理", "满意", "认同", "理解", "接受"])
                .with_words(-5.0, &[
                    "烂尾", "毁了", "崩坏", "垃圾", "恶心", "辣鸡", "狗屎", "最差", "灾难", "破防", "脚趾抠地",
                ])
                .with_words(-4.0, &[
                    "失望", "糟糕", "差劲", "无聊", "拖沓", "强行", "崩了", "烂", "幼稚", "无语", "槽点", "不满",
                ])
                .with_words(-3.0, &["可惜", "遗憾", "不行", "一般", "勉强", "意难平"])
                .with_words(LEANING_WEIGHT, &[
                    "思考", "反思", "探讨", "深度", "意义", "价值", "勇气", "自由", "和解", "真实",
                ])
                .with_words(-LEANING_WEIGHT, &[
                    "争议", "矛盾", "悲观", "无解", "困境", "荒谬", "虚无", "悲剧", "循环",
                ])
                .with_modifiers(
                    &["非常", "特别", "超级", "极其", "太", "很", "真的", "超", "巨", "贼", "十分", "相当", "极度"],
                    &["有点", "稍微", "还算", "比较", "略", "多少", "算是"],
                    &["不", "没", "别", "未", "非", "无", "否", "勿", "莫", "不是", "没有", "并非", "绝非"],
                ),
        );

        lexicon.insert(
            "en",
            LanguageLexicon::new(MatchMode::WordBoundary)
                .with_words(5.0, &[
                    "masterpiece", "perfect", "epic", "phenomenal", "brilliant", "genius", "10/10", "greatest",
                    "legendary",
                ])
                .with_words(4.0, &[
                    "amazing", "excellent", "outstanding", "fantastic", "incredible", "stunning", "powerful",
                    "beautiful", "awesome", "love",
                ])
                .with_words(3.0, &["good", "great", "nice", "solid", "decent", "enjoy"])
                .with_words(-5.0, &[
                    "terrible", "horrible", "garbage", "trash", "worst", "awful", "disgusting", "ruined",
                ])
                .with_words(-4.0, &[
                    "disappointing", "bad", "poor", "waste", "boring", "rushed", "mess", "weak",
                ])
                .with_words(-3.0, &["okay", "meh", "average", "mediocre", "underwhelming"])
                .with_words(LEANING_WEIGHT, &["depth", "meaning", "philosophy", "realistic", "complex"])
                .with_words(-LEANING_WEIGHT, &["controversial", "dark", "tragic", "bleak", "nihilistic"])
                .with_modifiers(
                    &["very", "extremely", "incredibly", "absolutely", "totally", "really", "so", "completely"],
                    &["somewhat", "fairly", "pretty", "quite", "rather", "kind of"],
                    &["not", "no", "n't", "never", "neither", "nor", "without"],
                ),
        );

        lexicon.insert(
            "ja",
            LanguageLexicon::new(MatchMode::Substring)
                .with_words(5.0, &["神作", "最高傑作", "完璧", "天才", "素晴らしすぎる", "最高"])
                .with_words(4.0, &[
                    "素晴らしい", "感動", "面白い", "泣ける", "すごい", "深い", "よかった", "良い",
                ])
                .with_words(3.0, &["いい", "好き", "楽しい", "まあまあ"])
                .with_words(-5.0, &["最悪", "クソ", "ゴミ", "駄作", "ひどすぎる"])
                .with_words(-4.0, &["つまらない", "残念", "がっかり", "微妙", "意味不明", "ひどい"])
                .with_words(-3.0, &["普通", "いまいち", "う〜ん"])
                .with_words(LEANING_WEIGHT, &["考えさせられる", "意味がある"])
                .with_words(-LEANING_WEIGHT, &["悲しい", "切ない", "複雑"])
                .with_modifiers(
                    &["とても", "非常に", "超", "めちゃくちゃ", "すごく", "本当に"],
                    &["ちょっと", "やや", "なんとなく"],
                    &["ない", "ません", "ぬ", "ん", "ず"],
                ),
        );

        lexicon
    }
}
