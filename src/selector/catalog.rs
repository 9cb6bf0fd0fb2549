//! Built-in selector catalog.
//!
//! Priority 1 covers page chrome and above-the-fold marketing blocks,
//! priority 2 repeated content blocks, priority 3 generic widgets.

use crate::result::ComponentType;
use crate::selector::CatalogEntry;

/// Ancestors whose buttons belong to navigation, not to the buttons type.
pub const CHROME_CONTAINERS: &str = "nav, header, footer";

/// The standard catalog, in declaration order.
#[must_use]
pub fn standard_entries() -> Vec<CatalogEntry> {
    use ComponentType as T;

    vec![
        // Priority 1
        CatalogEntry::new(T::Navigation, "nav, [role='navigation']", 1),
        CatalogEntry::new(T::Header, "header, [role='banner']", 1),
        CatalogEntry::new(
            T::Hero,
            ".hero, [class*='hero'], .jumbotron, .masthead, [class*='banner']",
            1,
        )
        .high_value(),
        CatalogEntry::new(
            T::Carousel,
            ".carousel, .slider, .swiper, [class*='carousel'], [data-slick]",
            1,
        )
        .high_value(),
        CatalogEntry::new(
            T::Product,
            ".product, [class*='product-card'], [class*='product-item'], [itemtype*='Product']",
            1,
        )
        .high_value(),
        CatalogEntry::new(
            T::Pricing,
            ".pricing, [class*='pricing'], [class*='price-table'], [class*='plan-card']",
            1,
        )
        .high_value(),
        // Priority 2
        CatalogEntry::new(T::Cards, ".card, .tile, [class*='-card']", 2),
        CatalogEntry::new(T::Features, ".features, [class*='feature']", 2).high_value(),
        CatalogEntry::new(
            T::Testimonial,
            ".testimonial, [class*='testimonial'], .review, blockquote",
            2,
        )
        .high_value(),
        CatalogEntry::new(T::Cta, ".cta, [class*='cta'], [class*='call-to-action']", 2).high_value(),
        // Priority 3
        CatalogEntry::new(
            T::Buttons,
            "button, .btn, [role='button'], input[type='submit']",
            3,
        )
        .excluding(CHROME_CONTAINERS),
        CatalogEntry::new(T::Forms, "form", 3),
        CatalogEntry::new(
            T::Search,
            "[role='search'], form[action*='search'], input[type='search']",
            3,
        ),
        CatalogEntry::new(T::Tabs, "[role='tablist'], .tabs, .nav-tabs", 3),
        CatalogEntry::new(T::Accordion, ".accordion, [class*='accordion'], details", 3),
        CatalogEntry::new(T::Gallery, ".gallery, [class*='gallery']", 3).high_value(),
        CatalogEntry::new(
            T::Breadcrumbs,
            ".breadcrumb, .breadcrumbs, [aria-label='breadcrumb'], [aria-label='Breadcrumb']",
            3,
        ),
        CatalogEntry::new(
            T::Pagination,
            ".pagination, [aria-label='pagination'], [aria-label='Pagination']",
            3,
        ),
        CatalogEntry::new(T::Table, "table", 3),
        CatalogEntry::new(T::Sidebar, "aside, .sidebar, [role='complementary']", 3),
        CatalogEntry::new(T::Footer, "footer, [role='contentinfo']", 3),
    ]
}
