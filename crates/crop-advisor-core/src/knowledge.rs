//! Static agronomy FAQ.
//!
//! [`answer`] matches a free-text question against a fixed table, first
//! by crop, then by topic keywords, and renders the matching entry as
//! plain text with a few follow-up suggestions.

use serde::Serialize;
use thiserror::Error;

pub struct CropInfo {
    pub key: &'static str,
    pub name: &'static str,
    pub season: &'static str,
    pub duration: &'static str,
    pub soil: &'static str,
    pub ph: &'static str,
    pub temperature: &'static str,
    pub rainfall: &'static str,
    pub irrigation: &'static str,
    pub npk: &'static str,
    pub diseases: &'static str,
    pub pests: &'static str,
    pub yield_per_hectare: &'static str,
    pub market_price: &'static str,
    pub tips: &'static str,
}

pub struct Practice {
    pub key: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub sections: &'static [(&'static str, &'static [&'static str])],
}

pub struct Scheme {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub details: &'static [(&'static str, &'static str)],
}

pub struct Technology {
    pub key: &'static str,
    pub description: &'static str,
    pub items_label: &'static str,
    pub items: &'static [&'static str],
    pub benefits: &'static [&'static str],
}

pub static CROPS: &[CropInfo] = &[
    CropInfo {
        key: "rice",
        name: "Rice",
        season: "Monsoon (Kharif)",
        duration: "120-150 days",
        soil: "Clay loam, loamy soil with good water retention",
        ph: "5.5-7.0",
        temperature: "21-37°C",
        rainfall: "100-200 cm annually",
        irrigation: "High water requirement, flooded conditions",
        npk: "N: 80-120 kg/ha, P: 40-60 kg/ha, K: 40-60 kg/ha",
        diseases: "Blast, Bacterial blight, Sheath blight, Brown spot",
        pests: "Stem borer, Leaf folder, Brown plant hopper",
        yield_per_hectare: "4-6 tons/hectare",
        market_price: "₹2000-2500 per quintal",
        tips: "Ensure proper water management, use disease-resistant varieties, maintain proper spacing",
    },
    CropInfo {
        key: "wheat",
        name: "Wheat",
        season: "Winter (Rabi)",
        duration: "110-130 days",
        soil: "Loamy soil with good drainage",
        ph: "6.0-7.5",
        temperature: "10-25°C",
        rainfall: "50-75 cm",
        irrigation: "4-6 irrigations required",
        npk: "N: 120-150 kg/ha, P: 60 kg/ha, K: 40 kg/ha",
        diseases: "Rust diseases, Powdery mildew, Loose smut",
        pests: "Aphids, Termites, Army worm",
        yield_per_hectare: "4-5 tons/hectare",
        market_price: "₹1800-2200 per quintal",
        tips: "Timely sowing is crucial, apply fertilizers in splits, control weeds early",
    },
    CropInfo {
        key: "maize",
        name: "Maize/Corn",
        season: "Summer/Monsoon",
        duration: "80-110 days",
        soil: "Well-drained loamy soil",
        ph: "5.5-7.5",
        temperature: "21-27°C",
        rainfall: "50-75 cm",
        irrigation: "Moderate, critical at flowering and grain filling",
        npk: "N: 120 kg/ha, P: 60 kg/ha, K: 40 kg/ha",
        diseases: "Maydis leaf blight, Turcicum leaf blight, Stalk rot",
        pests: "Fall army worm, Stem borer, Shoot fly",
        yield_per_hectare: "5-7 tons/hectare",
        market_price: "₹1600-2000 per quintal",
        tips: "Plant at proper spacing, ensure good drainage, protect from army worm",
    },
    CropInfo {
        key: "cotton",
        name: "Cotton",
        season: "Monsoon (Kharif)",
        duration: "150-180 days",
        soil: "Black cotton soil, well-drained loamy soil",
        ph: "6.0-7.5",
        temperature: "21-30°C",
        rainfall: "50-100 cm",
        irrigation: "5-7 irrigations required",
        npk: "N: 100-120 kg/ha, P: 50-60 kg/ha, K: 50-60 kg/ha",
        diseases: "Wilt, Root rot, Leaf spot, Boll rot",
        pests: "Bollworm, Aphids, Jassids, Whitefly",
        yield_per_hectare: "20-25 quintals/hectare (lint)",
        market_price: "₹5500-6500 per quintal",
        tips: "Use Bt cotton varieties, integrated pest management, proper spacing and pruning",
    },
    CropInfo {
        key: "sugarcane",
        name: "Sugarcane",
        season: "Year-round (perennial)",
        duration: "10-18 months",
        soil: "Deep, well-drained loamy soil",
        ph: "6.5-7.5",
        temperature: "20-26°C for germination, 30-35°C for growth",
        rainfall: "75-150 cm",
        irrigation: "Heavy water requirement, 15-20 irrigations",
        npk: "N: 200-250 kg/ha, P: 80-100 kg/ha, K: 100-150 kg/ha",
        diseases: "Red rot, Smut, Wilt, Rust",
        pests: "Early shoot borer, Top borer, Pyrilla",
        yield_per_hectare: "70-100 tons/hectare",
        market_price: "₹280-350 per quintal",
        tips: "Select disease-free seed cane, proper trash mulching, earthing up is essential",
    },
    CropInfo {
        key: "chickpea",
        name: "Chickpea/Gram",
        season: "Winter (Rabi)",
        duration: "100-120 days",
        soil: "Well-drained loamy to clay loam soil",
        ph: "6.0-7.5",
        temperature: "20-25°C",
        rainfall: "40-50 cm",
        irrigation: "2-3 light irrigations",
        npk: "N: 20 kg/ha, P: 40-60 kg/ha, K: 20 kg/ha (fixes own nitrogen)",
        diseases: "Wilt, Blight, Root rot, Rust",
        pests: "Pod borer, Aphids, Cut worm",
        yield_per_hectare: "1.5-2.5 tons/hectare",
        market_price: "₹4500-5500 per quintal",
        tips: "Treat seeds with Rhizobium, avoid waterlogging, spray for pod borer",
    },
    CropInfo {
        key: "potato",
        name: "Potato",
        season: "Winter (Rabi)",
        duration: "90-120 days",
        soil: "Well-drained loamy soil rich in organic matter",
        ph: "5.5-6.5",
        temperature: "15-25°C",
        rainfall: "50-70 cm",
        irrigation: "Regular light irrigations, 8-10 times",
        npk: "N: 150-180 kg/ha, P: 80-100 kg/ha, K: 100-120 kg/ha",
        diseases: "Late blight, Early blight, Wilt, Leaf roll virus",
        pests: "Aphids, Potato tuber moth, Cut worm",
        yield_per_hectare: "25-35 tons/hectare",
        market_price: "₹800-1500 per quintal",
        tips: "Use certified seed tubers, earthing up is crucial, store in cool dry place",
    },
    CropInfo {
        key: "tomato",
        name: "Tomato",
        season: "Year-round (protected cultivation)",
        duration: "60-80 days (after transplanting)",
        soil: "Well-drained loamy soil rich in organic matter",
        ph: "6.0-7.0",
        temperature: "20-30°C",
        rainfall: "Moderate, 60-150 cm",
        irrigation: "Regular irrigation, drip irrigation preferred",
        npk: "N: 100-120 kg/ha, P: 80 kg/ha, K: 60 kg/ha",
        diseases: "Early blight, Late blight, Leaf curl virus, Wilt",
        pests: "Fruit borer, Whitefly, Leaf miner",
        yield_per_hectare: "40-60 tons/hectare",
        market_price: "₹1000-3000 per quintal (seasonal variation)",
        tips: "Use staking for support, regular pruning, mulching helps retain moisture",
    },
];

pub static PRACTICES: &[Practice] = &[
    Practice {
        key: "crop_rotation",
        title: "Crop Rotation",
        description: "Practice of growing different crops in sequence on the same land",
        sections: &[
            (
                "Benefits",
                &[
                    "Improves soil fertility",
                    "Reduces pest and disease buildup",
                    "Breaks weed cycles",
                    "Improves soil structure",
                    "Reduces soil erosion",
                ],
            ),
            (
                "Examples",
                &[
                    "Rice -> Wheat -> Legume",
                    "Cotton -> Wheat -> Chickpea",
                    "Maize -> Potato -> Wheat",
                ],
            ),
        ],
    },
    Practice {
        key: "organic_farming",
        title: "Organic Farming",
        description: "Farming without synthetic chemicals, using natural inputs",
        sections: &[
            (
                "Key Practices",
                &[
                    "Use of compost and farmyard manure",
                    "Green manuring with leguminous crops",
                    "Biological pest control",
                    "Crop rotation and mixed cropping",
                    "Use of bio-fertilizers (Rhizobium, Azotobacter)",
                ],
            ),
            (
                "Benefits",
                &[
                    "Improves soil health",
                    "Environmentally sustainable",
                    "Better product quality",
                    "Higher market price for organic produce",
                ],
            ),
        ],
    },
    Practice {
        key: "integrated_pest_management",
        title: "Integrated Pest Management",
        description: "Eco-friendly approach to manage pests using multiple strategies",
        sections: &[
            (
                "Strategies",
                &[
                    "Cultural methods: crop rotation, resistant varieties",
                    "Mechanical methods: traps, hand picking",
                    "Biological control: natural predators, parasites",
                    "Chemical control: as last resort, selective pesticides",
                ],
            ),
            (
                "Benefits",
                &[
                    "Reduced pesticide use",
                    "Cost-effective",
                    "Environmentally safe",
                    "Sustainable pest control",
                ],
            ),
        ],
    },
    Practice {
        key: "water_management",
        title: "Water Management",
        description: "Efficient use of water resources in agriculture",
        sections: &[
            (
                "Techniques",
                &[
                    "Drip irrigation: 40-60% water saving",
                    "Sprinkler irrigation: 30-40% water saving",
                    "Mulching: reduces evaporation",
                    "Rainwater harvesting",
                    "Laser land leveling",
                ],
            ),
            (
                "Benefits",
                &[
                    "Water conservation",
                    "Reduced waterlogging",
                    "Better crop yields",
                    "Energy savings",
                ],
            ),
        ],
    },
];

/// Soil management topic keys.
pub static SOIL_TOPICS: &[&str] = &["soil_testing", "soil_health"];

const SOIL_TEST_PARAMETERS: &[&str] = &[
    "Nitrogen (N)",
    "Phosphorus (P)",
    "Potassium (K)",
    "pH",
    "Organic carbon",
    "Micronutrients",
];
const SOIL_TEST_BENEFITS: &[&str] = &[
    "Optimal fertilizer use",
    "Cost savings",
    "Better yields",
    "Prevents soil degradation",
];
const SOIL_HEALTH_INDICATORS: &[&str] = &[
    "Organic matter content: >0.5% is good",
    "pH level: 6.0-7.5 for most crops",
    "NPK levels: balanced nutrients",
    "Soil structure: good aggregation",
    "Biological activity: earthworms, microbes",
];
const SOIL_IMPROVEMENT: &[&str] = &[
    "Add organic matter regularly",
    "Practice crop rotation",
    "Avoid over-tillage",
    "Use cover crops",
    "Balance fertilizer application",
];

pub static SCHEMES: &[Scheme] = &[
    Scheme {
        key: "pm_kisan",
        name: "PM-KISAN (Pradhan Mantri Kisan Samman Nidhi)",
        description: "Direct income support of ₹6000/year to farmers",
        details: &[
            ("Eligibility", "All landholding farmers"),
            ("Benefits", "₹2000 in three equal installments"),
        ],
    },
    Scheme {
        key: "pm_fasal_bima",
        name: "PM Fasal Bima Yojana",
        description: "Crop insurance scheme",
        details: &[
            ("Coverage", "Yield losses, prevented sowing, post-harvest losses"),
            ("Premium", "1.5-2% of sum insured for farmers"),
        ],
    },
    Scheme {
        key: "soil_health_card",
        name: "Soil Health Card Scheme",
        description: "Free soil testing for farmers",
        details: &[(
            "Benefits",
            "Crop-wise nutrient recommendations, saves fertilizer cost",
        )],
    },
    Scheme {
        key: "kisan_credit_card",
        name: "Kisan Credit Card (KCC)",
        description: "Credit facility for farmers",
        details: &[(
            "Benefits",
            "Short-term credit for cultivation, interest subvention of 2-3%",
        )],
    },
];

pub static TECHNOLOGIES: &[Technology] = &[
    Technology {
        key: "precision_agriculture",
        description: "Using technology for precise farm management",
        items_label: "Tools",
        items: &[
            "GPS-guided tractors",
            "Drones for monitoring",
            "Soil sensors",
            "Variable rate applicators",
        ],
        benefits: &[
            "Optimized input use",
            "Higher yields",
            "Reduced environmental impact",
        ],
    },
    Technology {
        key: "protected_cultivation",
        description: "Growing crops in controlled environment",
        items_label: "Types",
        items: &["Polyhouse", "Greenhouse", "Net house", "Shade house"],
        benefits: &[
            "Year-round production",
            "Higher yields",
            "Quality produce",
            "Protection from weather",
        ],
    },
];

const SELLING_TIPS: &[&str] = &[
    "Check daily market rates before selling",
    "Sell during peak demand seasons",
    "Consider direct marketing to consumers",
    "Form farmer producer organizations (FPOs)",
    "Use e-NAM platform for better prices",
];
const STORAGE_TIPS: &[&str] = &[
    "Proper cleaning and drying before storage",
    "Use improved storage structures",
    "Protect from pests and moisture",
    "Consider warehouse receipt system",
];

/// Keyword → practice key, checked in order.
const PRACTICE_KEYWORDS: &[(&str, &str)] = &[
    ("rotation", "crop_rotation"),
    ("organic", "organic_farming"),
    ("pest", "integrated_pest_management"),
    ("water", "water_management"),
    ("irrigation", "water_management"),
];
const SOIL_KEYWORDS: &[&str] = &["soil", "testing", "fertility", "ph", "nutrients"];
const SCHEME_KEYWORDS: &[&str] = &[
    "scheme",
    "subsidy",
    "government",
    "pm kisan",
    "insurance",
    "credit",
    "loan",
];
const TECH_KEYWORDS: &[&str] = &[
    "technology",
    "precision",
    "drone",
    "greenhouse",
    "polyhouse",
    "modern",
];
const MARKET_KEYWORDS: &[&str] = &["market", "price", "selling", "storage", "sell"];

/// What a question was matched to.
pub enum Topic {
    Crop(&'static CropInfo),
    Practice(&'static Practice),
    Soil,
    Schemes,
    Technology,
    Market,
    General,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatReply {
    pub response: String,
    pub category: String,
    pub suggestions: Vec<String>,
}

#[derive(Debug, Error)]
#[error("message cannot be empty")]
pub struct EmptyQuery;

/// Topic keys grouped by section.
#[derive(Debug, Clone, Serialize)]
pub struct Topics {
    pub crops: Vec<&'static str>,
    pub farming_practices: Vec<&'static str>,
    pub soil_management: Vec<&'static str>,
    pub government_schemes: Vec<&'static str>,
    pub technologies: Vec<&'static str>,
    pub total_topics: usize,
}

/// True when `needle` occurs in `haystack` at the start of a word, so
/// "rice" matches "rice" and "rice?" but not "price".
fn contains_word_start(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(i, _)| {
        haystack[..i]
            .chars()
            .next_back()
            .map_or(true, |c| !c.is_alphanumeric())
    })
}

fn any_keyword(query: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| query.contains(k))
}

pub fn match_topic(query: &str) -> Topic {
    let q = query.to_lowercase();

    if let Some(crop) = CROPS.iter().find(|c| {
        contains_word_start(&q, c.key) || contains_word_start(&q, &c.name.to_lowercase())
    }) {
        return Topic::Crop(crop);
    }

    for (keyword, key) in PRACTICE_KEYWORDS {
        if q.contains(keyword) {
            if let Some(practice) = PRACTICES.iter().find(|p| p.key == *key) {
                return Topic::Practice(practice);
            }
        }
    }

    if any_keyword(&q, SOIL_KEYWORDS) {
        Topic::Soil
    } else if any_keyword(&q, SCHEME_KEYWORDS) {
        Topic::Schemes
    } else if any_keyword(&q, TECH_KEYWORDS) {
        Topic::Technology
    } else if any_keyword(&q, MARKET_KEYWORDS) {
        Topic::Market
    } else {
        Topic::General
    }
}

/// Answers a free-text farming question.
pub fn answer(query: &str) -> Result<ChatReply, EmptyQuery> {
    let query = query.trim();
    if query.is_empty() {
        return Err(EmptyQuery);
    }

    let topic = match_topic(query);
    let (response, category) = match &topic {
        Topic::Crop(crop) => (render_crop(crop), format!("Crop Information - {}", crop.name)),
        Topic::Practice(practice) => (render_practice(practice), "Farming Practices".to_string()),
        Topic::Soil => (render_soil(), "Soil Management".to_string()),
        Topic::Schemes => (render_schemes(), "Government Schemes".to_string()),
        Topic::Technology => (render_technology(), "Agricultural Technology".to_string()),
        Topic::Market => (render_market(), "Market Intelligence".to_string()),
        Topic::General => (GENERAL_HELP.to_string(), "General Information".to_string()),
    };

    Ok(ChatReply {
        response,
        category,
        suggestions: suggestions(&topic).iter().map(|s| s.to_string()).collect(),
    })
}

pub fn topics() -> Topics {
    let crops: Vec<&'static str> = CROPS.iter().map(|c| c.key).collect();
    let farming_practices: Vec<&'static str> = PRACTICES.iter().map(|p| p.key).collect();
    let soil_management = SOIL_TOPICS.to_vec();
    let government_schemes: Vec<&'static str> = SCHEMES.iter().map(|s| s.key).collect();
    let technologies: Vec<&'static str> = TECHNOLOGIES.iter().map(|t| t.key).collect();
    let total_topics = crops.len()
        + farming_practices.len()
        + soil_management.len()
        + government_schemes.len()
        + technologies.len();

    Topics {
        crops,
        farming_practices,
        soil_management,
        government_schemes,
        technologies,
        total_topics,
    }
}

fn suggestions(topic: &Topic) -> &'static [&'static str] {
    match topic {
        Topic::Crop(_) => &[
            "Tell me about soil requirements",
            "What are common diseases?",
            "How to increase yield?",
            "Market price information",
        ],
        Topic::Practice(_) => &[
            "Tell me about organic farming",
            "Water management techniques",
            "Integrated pest management",
            "Crop rotation benefits",
        ],
        Topic::Soil => &[
            "How to improve soil fertility?",
            "Soil testing process",
            "Organic matter importance",
            "pH management",
        ],
        Topic::Schemes => &[
            "PM-KISAN details",
            "Crop insurance schemes",
            "Kisan Credit Card",
            "Soil Health Card",
        ],
        Topic::Technology => &[
            "Precision agriculture",
            "Greenhouse farming",
            "Drip irrigation",
            "Drone technology",
        ],
        Topic::Market => &[
            "Best time to sell",
            "Storage techniques",
            "Market trends",
            "e-NAM platform",
        ],
        Topic::General => &[
            "Tell me about rice cultivation",
            "Government schemes for farmers",
            "Soil testing importance",
            "Modern farming technologies",
            "Organic farming practices",
            "Water conservation methods",
        ],
    }
}

fn push_list(out: &mut String, heading: &str, items: &[&str]) {
    out.push_str(heading);
    out.push_str(":\n");
    for item in items {
        out.push_str("- ");
        out.push_str(item);
        out.push('\n');
    }
}

fn render_crop(c: &CropInfo) -> String {
    format!(
        "{name}\n\n\
         Season: {season}\n\
         Duration: {duration}\n\n\
         Soil: {soil}\n\
         pH: {ph}\n\n\
         Climate:\n\
         - Temperature: {temperature}\n\
         - Rainfall: {rainfall}\n\n\
         Irrigation: {irrigation}\n\n\
         Fertilizer requirements: {npk}\n\n\
         Common diseases: {diseases}\n\
         Common pests: {pests}\n\n\
         Expected yield: {yield_}\n\
         Market price: {price}\n\n\
         Tips: {tips}\n",
        name = c.name,
        season = c.season,
        duration = c.duration,
        soil = c.soil,
        ph = c.ph,
        temperature = c.temperature,
        rainfall = c.rainfall,
        irrigation = c.irrigation,
        npk = c.npk,
        diseases = c.diseases,
        pests = c.pests,
        yield_ = c.yield_per_hectare,
        price = c.market_price,
        tips = c.tips,
    )
}

fn render_practice(p: &Practice) -> String {
    let mut out = format!("{}\n\n{}\n\n", p.title, p.description);
    for (i, (heading, items)) in p.sections.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        push_list(&mut out, heading, items);
    }
    out
}

fn render_soil() -> String {
    let mut out = String::from("Soil Management\n\n");
    out.push_str("Soil testing is essential for knowing the nutrient status and pH of soil.\n");
    out.push_str(&format!(
        "Parameters to test: {}\n",
        SOIL_TEST_PARAMETERS.join(", ")
    ));
    out.push_str("Frequency: once every 2-3 years\n\n");
    push_list(&mut out, "Benefits", SOIL_TEST_BENEFITS);
    out.push('\n');
    push_list(&mut out, "Soil health indicators", SOIL_HEALTH_INDICATORS);
    out.push('\n');
    push_list(&mut out, "Ways to improve soil health", SOIL_IMPROVEMENT);
    out
}

fn render_schemes() -> String {
    let mut out = String::from("Government Schemes for Farmers\n\n");
    for scheme in SCHEMES {
        out.push_str(scheme.name);
        out.push('\n');
        out.push_str(scheme.description);
        out.push('\n');
        for (label, value) in scheme.details {
            out.push_str(&format!("{}: {}\n", label, value));
        }
        out.push('\n');
    }
    out
}

fn render_technology() -> String {
    let mut out = String::from("Modern Agricultural Technologies\n\n");
    for tech in TECHNOLOGIES {
        out.push_str(tech.description);
        out.push_str("\n\n");
        push_list(&mut out, tech.items_label, tech.items);
        push_list(&mut out, "Benefits", tech.benefits);
        out.push('\n');
    }
    out
}

fn render_market() -> String {
    let mut out = String::from("Market Intelligence and Selling Tips\n\n");
    push_list(&mut out, "Selling strategies", SELLING_TIPS);
    out.push('\n');
    push_list(&mut out, "Storage best practices", STORAGE_TIPS);
    out
}

const GENERAL_HELP: &str = "Welcome to the agriculture assistant.

I can help with:

Crop information
- Cultivation guides for rice, wheat, maize, cotton, sugarcane, chickpea, potato and tomato
- Season, soil, climate and irrigation requirements
- Disease and pest management
- Expected yields and market prices

Farming practices
- Organic farming, crop rotation, integrated pest management, water management

Soil management
- Soil testing, fertility, pH and nutrient management

Government schemes
- PM-KISAN, PM Fasal Bima Yojana, Soil Health Card, Kisan Credit Card

Modern technologies
- Precision agriculture, protected cultivation, drip irrigation, drones

Market intelligence
- Selling strategies and storage practices

Ask me anything about farming.
";
