use std::fmt;
use std::str::FromStr;

/// 選択肢に並ぶ作物
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crop {
    Tomato,
    Potato,
    Rice,
    Wheat,
    Maize,
    Cotton,
}

impl Crop {
    pub const ALL: [Crop; 6] = [
        Crop::Tomato,
        Crop::Potato,
        Crop::Rice,
        Crop::Wheat,
        Crop::Maize,
        Crop::Cotton,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Crop::Tomato => "Tomato",
            Crop::Potato => "Potato",
            Crop::Rice => "Rice",
            Crop::Wheat => "Wheat",
            Crop::Maize => "Maize",
            Crop::Cotton => "Cotton",
        }
    }
}

/// 作物の指定（未指定・選択肢・手入力）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CropChoice {
    #[default]
    Unspecified,
    Known(Crop),
    Custom(String),
}

impl CropChoice {
    /// フォームの `crop_type` に入れる値（未指定は空文字）
    pub fn form_value(&self) -> String {
        match self {
            CropChoice::Unspecified => String::new(),
            CropChoice::Known(crop) => crop.name().to_string(),
            CropChoice::Custom(name) => name.trim().to_string(),
        }
    }
}

impl FromStr for CropChoice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Ok(CropChoice::Unspecified);
        }

        let known = Crop::ALL
            .iter()
            .find(|crop| crop.name().eq_ignore_ascii_case(trimmed));

        Ok(match known {
            Some(crop) => CropChoice::Known(*crop),
            None => CropChoice::Custom(trimmed.to_string()),
        })
    }
}

impl fmt::Display for CropChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CropChoice::Unspecified => write!(f, "-"),
            other => f.write_str(&other.form_value()),
        }
    }
}
