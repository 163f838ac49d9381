//! Static animal vocabulary tables: the keyword list used to pick animal
//! classes out of a model's vocabulary, the Russian translation dictionary,
//! and the built-in class lists for models that ship without metadata.
//!
//! Dictionary keys are stored lowercase; all lookups lowercase their input,
//! so "Dog", "dog" and "DOG" resolve identically.

/// Keywords matched as substrings against lowercased class names. Broad on
/// purpose: it catches "polar bear" via "bear" and "sea lion" via "lion",
/// at the cost of substring false positives like "hot dog" and "catfish".
pub const ANIMAL_KEYWORDS: &[&str] = &[
    "cat",
    "dog",
    "elephant",
    "horse",
    "giraffe",
    "bear",
    "bird",
    "cattle",
    "ox",
    "ram",
    "goat",
    "sheep",
    "pig",
    "cow",
    "bull",
    "lion",
    "tiger",
    "wolf",
    "fox",
    "deer",
    "rabbit",
    "hare",
    "mouse",
    "rat",
    "squirrel",
    "hedgehog",
    "bat",
    "zebra",
    "leopard",
    "jaguar",
    "cheetah",
    "panda",
    "koala",
    "kangaroo",
    "monkey",
    "gorilla",
    "chimpanzee",
    "orangutan",
    "hamster",
    "guinea",
    "chipmunk",
    "beaver",
    "otter",
    "seal",
    "walrus",
    "dolphin",
    "whale",
    "shark",
    "coyote",
    "hyena",
    "raccoon",
    "skunk",
    "sloth",
    "anteater",
    "armadillo",
    "platypus",
    "echidna",
    "mammal",
    "reptile",
    "amphibian",
    "fish",
    "insect",
    "animal",
];

/// English class name (lowercase) to Russian display name.
pub const RU_TRANSLATIONS: &[(&str, &str)] = &[
    ("animal", "животное"),
    ("mammal", "млекопитающее"),
    ("dog", "собака"),
    ("cat", "кот"),
    ("horse", "лошадь"),
    ("cow", "корова"),
    ("pig", "свинья"),
    ("sheep", "овца"),
    ("goat", "коза"),
    ("deer", "олень"),
    ("elephant", "слон"),
    ("giraffe", "жираф"),
    ("zebra", "зебра"),
    ("lion", "лев"),
    ("tiger", "тигр"),
    ("leopard", "леопард"),
    ("jaguar", "ягуар"),
    ("cheetah", "гепард"),
    ("bear", "медведь"),
    ("polar bear", "белый медведь"),
    ("panda", "панда"),
    ("koala", "коала"),
    ("kangaroo", "кенгуру"),
    ("monkey", "обезьяна"),
    ("gorilla", "горилла"),
    ("chimpanzee", "шимпанзе"),
    ("orangutan", "орангутан"),
    ("rabbit", "кролик"),
    ("hamster", "хомяк"),
    ("guinea pig", "морская свинка"),
    ("mouse", "мышь"),
    ("rat", "крыса"),
    ("squirrel", "белка"),
    ("chipmunk", "бурундук"),
    ("beaver", "бобр"),
    ("otter", "выдра"),
    ("seal", "тюлень"),
    ("sea lion", "морской лев"),
    ("walrus", "морж"),
    ("dolphin", "дельфин"),
    ("whale", "кит"),
    ("shark", "акула"),
    ("bat", "летучая мышь"),
    ("fox", "лиса"),
    ("wolf", "волк"),
    ("coyote", "койот"),
    ("hyena", "гиена"),
    ("raccoon", "енот"),
    ("skunk", "скунс"),
    ("hedgehog", "еж"),
    ("sloth", "ленивец"),
    ("anteater", "муравьед"),
    ("armadillo", "броненосец"),
    ("platypus", "утконос"),
    ("echidna", "ехидна"),
    ("bird", "птица"),
    ("cattle", "крупный рогатый скот"),
    ("ox", "вол"),
    ("ram", "баран"),
    ("hare", "заяц"),
    ("bull", "бык"),
];

/// COCO vocabulary in index order, used for 80-class ultralytics exports
/// that carry no "names" metadata.
pub const COCO_CLASSES: &[&str] = &[
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// MegaDetector vocabulary. Only "animal" survives the allow-list.
pub const MEGADETECTOR_CLASSES: &[&str] = &["animal", "person", "vehicle"];

/// The keyword and translation tables a registry matches against. Carried
/// explicitly rather than read from globals so tests can substitute their
/// own tables.
#[derive(Debug, Clone)]
pub struct ClassTables {
    pub keywords: Vec<String>,
    pub translations: Vec<(String, String)>,
}

impl Default for ClassTables {
    fn default() -> Self {
        Self {
            keywords: ANIMAL_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            translations: RU_TRANSLATIONS
                .iter()
                .map(|(en, ru)| (en.to_string(), ru.to_string()))
                .collect(),
        }
    }
}

impl ClassTables {
    /// True when any keyword occurs as a substring of the lowercased name.
    pub fn matches_keyword(&self, class_name: &str) -> bool {
        let name = class_name.to_lowercase();
        self.keywords.iter().any(|keyword| name.contains(keyword))
    }

    /// Exact dictionary lookup, case-insensitive on the input.
    pub fn translate(&self, class_name: &str) -> Option<&str> {
        let name = class_name.to_lowercase();
        self.translations
            .iter()
            .find(|(en, _)| *en == name)
            .map(|(_, ru)| ru.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_matching_is_case_insensitive() {
        let tables = ClassTables::default();
        assert!(tables.matches_keyword("Dog"));
        assert!(tables.matches_keyword("POLAR BEAR"));
        assert!(!tables.matches_keyword("traffic light"));
    }

    #[test]
    fn test_keyword_substring_false_positives() {
        let tables = ClassTables::default();
        // Documented trade-off of substring matching.
        assert!(tables.matches_keyword("hot dog"));
        assert!(tables.matches_keyword("catfish"));
        assert!(tables.matches_keyword("toy box")); // "ox"
    }

    #[test]
    fn test_translate_known_and_unknown() {
        let tables = ClassTables::default();
        assert_eq!(tables.translate("dog"), Some("собака"));
        assert_eq!(tables.translate("Dog"), Some("собака"));
        assert_eq!(tables.translate("Polar Bear"), Some("белый медведь"));
        assert_eq!(tables.translate("axolotl"), None);
    }

    #[test]
    fn test_translation_keys_are_lowercase() {
        for (en, _) in RU_TRANSLATIONS {
            assert_eq!(*en, en.to_lowercase(), "key {en} must be lowercase");
        }
    }

    #[test]
    fn test_coco_vocabulary_shape() {
        assert_eq!(COCO_CLASSES.len(), 80);
        assert_eq!(COCO_CLASSES[16], "dog");
        assert_eq!(COCO_CLASSES[23], "giraffe");
        assert_eq!(MEGADETECTOR_CLASSES.len(), 3);
    }
}
