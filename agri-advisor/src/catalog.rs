//! Static display catalogs for predicted labels
//!
//! The label space of the models is not guaranteed to be covered here; a
//! lookup miss resolves to the catalog's unknown entry.

use once_cell::sync::Lazy;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    pub title: &'static str,
    pub description: &'static str,
    pub image_ref: &'static str,
}

impl CatalogEntry {
    const fn new(title: &'static str, description: &'static str, image_ref: &'static str) -> Self {
        Self {
            title,
            description,
            image_ref,
        }
    }
}

/// Label → entry table with a mandatory fallback
#[derive(Debug)]
pub struct Catalog {
    name: &'static str,
    entries: HashMap<&'static str, CatalogEntry>,
    unknown: CatalogEntry,
}

impl Catalog {
    pub fn new(
        name: &'static str,
        entries: impl IntoIterator<Item = (&'static str, CatalogEntry)>,
        unknown: CatalogEntry,
    ) -> Self {
        Self {
            name,
            entries: entries.into_iter().collect(),
            unknown,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Exact-match lookup; never fails
    pub fn lookup(&self, label: &str) -> &CatalogEntry {
        self.entries.get(label).unwrap_or(&self.unknown)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn unknown(&self) -> &CatalogEntry {
        &self.unknown
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

const NO_INFO: &str = "No additional information available.";

pub static CROP_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "crop",
        [
            ("Rice", CatalogEntry::new("Rice", "Staple cereal grown in flooded paddies; thrives in high humidity and heavy rainfall.", "/images/crops/rice.jpg")),
            ("Maize", CatalogEntry::new("Maize", "Versatile cereal for grain and fodder; prefers well-drained loam and moderate rainfall.", "/images/crops/maize.jpg")),
            ("ChickPea", CatalogEntry::new("Chickpea", "Drought-tolerant pulse that fixes nitrogen; suited to cool, dry growing seasons.", "/images/crops/chickpea.jpg")),
            ("KidneyBeans", CatalogEntry::new("Kidney Beans", "Protein-rich legume for mild climates with low humidity at harvest.", "/images/crops/kidneybeans.jpg")),
            ("PigeonPeas", CatalogEntry::new("Pigeon Peas", "Hardy perennial legume that tolerates poor soils and erratic rainfall.", "/images/crops/pigeonpeas.jpg")),
            ("MothBeans", CatalogEntry::new("Moth Beans", "Very drought-resistant pulse for arid and semi-arid regions.", "/images/crops/mothbeans.jpg")),
            ("MungBean", CatalogEntry::new("Mung Bean", "Short-duration pulse, good for crop rotation in warm humid weather.", "/images/crops/mungbean.jpg")),
            ("Blackgram", CatalogEntry::new("Black Gram", "Warm-season pulse grown on loamy soils with good moisture retention.", "/images/crops/blackgram.jpg")),
            ("Lentil", CatalogEntry::new("Lentil", "Cool-season legume that grows well on low rainfall with residual soil moisture.", "/images/crops/lentil.jpg")),
            ("Pomegranate", CatalogEntry::new("Pomegranate", "Fruit shrub for semi-arid climates; tolerates alkaline soils.", "/images/crops/pomegranate.jpg")),
            ("Banana", CatalogEntry::new("Banana", "Tropical fruit needing rich soil, high potassium and steady moisture.", "/images/crops/banana.jpg")),
            ("Mango", CatalogEntry::new("Mango", "Tropical fruit tree that needs a dry spell before flowering.", "/images/crops/mango.jpg")),
            ("Grapes", CatalogEntry::new("Grapes", "Vine fruit for warm, dry climates with very high potassium demand.", "/images/crops/grapes.jpg")),
            ("Watermelon", CatalogEntry::new("Watermelon", "Warm-season vine for sandy loam with plenty of sunshine.", "/images/crops/watermelon.jpg")),
            ("Muskmelon", CatalogEntry::new("Muskmelon", "Sweet melon for hot dry weather and light, well-drained soil.", "/images/crops/muskmelon.jpg")),
            ("Apple", CatalogEntry::new("Apple", "Temperate fruit tree requiring winter chill and high phosphorus.", "/images/crops/apple.jpg")),
            ("Orange", CatalogEntry::new("Orange", "Citrus tree for subtropical climates with moderate rainfall.", "/images/crops/orange.jpg")),
            ("Papaya", CatalogEntry::new("Papaya", "Fast-growing tropical fruit sensitive to waterlogging and frost.", "/images/crops/papaya.jpg")),
            ("Coconut", CatalogEntry::new("Coconut", "Coastal palm thriving in humid climates and sandy soils.", "/images/crops/coconut.jpg")),
            ("Cotton", CatalogEntry::new("Cotton", "Fibre crop for black soils, long frost-free season and moderate rain.", "/images/crops/cotton.jpg")),
            ("Jute", CatalogEntry::new("Jute", "Bast-fibre crop grown in warm, humid alluvial plains.", "/images/crops/jute.jpg")),
            ("Coffee", CatalogEntry::new("Coffee", "Shade-loving plantation crop for humid uplands and well-drained soil.", "/images/crops/coffee.jpg")),
        ],
        CatalogEntry::new("Unknown Crop", NO_INFO, "/default-crop-image.jpg"),
    )
});

pub static FERTILIZER_CATALOG: Lazy<Catalog> = Lazy::new(|| {
    Catalog::new(
        "fertilizer",
        [
            ("Urea", CatalogEntry::new("Urea", "High-nitrogen fertilizer (46% N) for vigorous vegetative growth.", "/images/fertilizers/urea.jpg")),
            ("DAP", CatalogEntry::new("DAP", "Diammonium phosphate (18-46-0); supplies phosphorus for root development.", "/images/fertilizers/dap.jpg")),
            ("14-35-14", CatalogEntry::new("14-35-14", "Phosphorus-rich NPK complex for flowering and fruit set.", "/images/fertilizers/14-35-14.jpg")),
            ("28-28", CatalogEntry::new("28-28", "Balanced nitrogen and phosphorus blend for early crop stages.", "/images/fertilizers/28-28.jpg")),
            ("17-17-17", CatalogEntry::new("17-17-17", "Balanced NPK for general-purpose nutrition.", "/images/fertilizers/17-17-17.jpg")),
            ("20-20", CatalogEntry::new("20-20", "Equal nitrogen and phosphorus for soils low in both.", "/images/fertilizers/20-20.jpg")),
            ("10-26-26", CatalogEntry::new("10-26-26", "Phosphorus and potassium rich blend for fruiting crops.", "/images/fertilizers/10-26-26.jpg")),
        ],
        CatalogEntry::new("Unknown Fertilizer", NO_INFO, "/default-fertilizer-image.jpg"),
    )
});
