//! Where the pet is allowed to be, and where it wants to go next.

use crate::config::{PetConfig, TagWeights};
use crate::geom::{clamp_range, Point, Rect, Size};
use crate::page::{ElementBox, ElementId, Page, Tag};
use rand::Rng;
use std::time::Duration;

/// Height of the top band covered by fixed/sticky chrome.
///
/// Pinned elements are walked top-down; one extends the band when its top
/// edge touches what is already covered, so a sticky nav stuck under a fixed
/// header grows the band but a floating fixed badge lower down does not.
pub(crate) fn compute_band(elements: &[ElementBox], vp: Size) -> f32 {
    const TOUCH: f32 = 1.0;

    let mut pinned: Vec<&Rect> = elements
        .iter()
        .filter(|e| e.positioning.is_pinned() && e.rect.intersects_viewport(vp))
        .map(|e| &e.rect)
        .collect();
    pinned.sort_by(|a, b| a.y.total_cmp(&b.y));

    let mut band = 0.0f32;
    for r in pinned {
        if r.y <= band + TOUCH {
            band = band.max(r.bottom());
        }
    }
    clamp_range(band, 0.0, vp.h.max(0.0))
}

/// Band height, recomputed on a wall-clock throttle.
#[derive(Clone, Debug, Default)]
pub(crate) struct BandTracker {
    height: f32,
    checked_at: Option<Duration>,
}

impl BandTracker {
    pub(crate) fn height(&self) -> f32 {
        self.height
    }

    pub(crate) fn refresh_if_due<P: Page + ?Sized>(
        &mut self,
        page: &P,
        now: Duration,
        every: Duration,
    ) -> bool {
        let due = match self.checked_at {
            None => true,
            Some(at) => now.saturating_sub(at) >= every,
        };
        if due {
            self.force(page, now);
        }
        due
    }

    pub(crate) fn force<P: Page + ?Sized>(&mut self, page: &P, now: Duration) {
        self.height = compute_band(&page.elements(), page.viewport());
        self.checked_at = Some(now);
    }
}

/// Allowed range for the agent's top-left corner.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Bounds {
    pub(crate) min: Point,
    pub(crate) max: Point,
}

impl Bounds {
    pub(crate) fn new(vp: Size, band: f32, size: Size, pad: f32) -> Self {
        Self {
            min: Point::new(pad, band + pad),
            max: Point::new(vp.w - size.w - pad, vp.h - size.h - pad),
        }
    }

    pub(crate) fn clamp(&self, p: Point) -> Point {
        Point::new(
            clamp_range(p.x, self.min.x, self.max.x),
            clamp_range(p.y, self.min.y, self.max.y),
        )
    }

    pub(crate) fn random_point<R: Rng + ?Sized>(&self, rng: &mut R) -> Point {
        let pick = |lo: f32, hi: f32, rng: &mut R| {
            if hi > lo {
                rng.gen_range(lo..hi)
            } else {
                lo
            }
        };
        let x = pick(self.min.x, self.max.x, rng);
        let y = pick(self.min.y, self.max.y, rng);
        Point::new(x, y)
    }
}

/// Weak back-reference to the element a target was derived from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct ElementRef {
    pub(crate) id: ElementId,
    pub(crate) tag: Tag,
    /// Jitter applied to the element's center.
    pub(crate) offset: Point,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Target {
    pub(crate) point: Point,
    pub(crate) element: Option<ElementRef>,
}

impl Target {
    pub(crate) fn free(point: Point) -> Self {
        Self {
            point,
            element: None,
        }
    }
}

pub(crate) fn tag_weight(tag: Tag, w: &TagWeights) -> f32 {
    match tag {
        Tag::Img => w.img,
        Tag::P => w.paragraph,
        Tag::A | Tag::Button => w.link,
        Tag::Other => 0.0,
    }
}

/// Whether an element may currently serve as a destination.
pub(crate) fn is_candidate(e: &ElementBox, vp: Size, band: f32, cfg: &PetConfig) -> bool {
    e.tag.is_destination()
        && !e.ignored
        && !e.positioning.is_pinned()
        && e.rect.w >= cfg.min_target_size.w
        && e.rect.h >= cfg.min_target_size.h
        && e.rect.intersects_viewport(vp)
        && e.rect.y >= band
}

pub(crate) fn collect_candidates(
    elements: &[ElementBox],
    vp: Size,
    band: f32,
    cfg: &PetConfig,
) -> Vec<ElementBox> {
    elements
        .iter()
        .filter(|e| is_candidate(e, vp, band, cfg))
        .copied()
        .collect()
}

/// Cumulative-weight scan. Items with non-positive weight are never drawn.
pub(crate) fn weighted_pick<T, R, F>(rng: &mut R, items: &[T], weight: F) -> Option<usize>
where
    R: Rng + ?Sized,
    F: Fn(&T) -> f32,
{
    let total: f32 = items.iter().map(|t| weight(t).max(0.0)).sum();
    if total <= 0.0 || !total.is_finite() {
        return None;
    }
    let mut roll = rng.gen_range(0.0..total);
    let mut last = None;
    for (i, item) in items.iter().enumerate() {
        let w = weight(item).max(0.0);
        if w <= 0.0 {
            continue;
        }
        if roll < w {
            return Some(i);
        }
        roll -= w;
        last = Some(i);
    }
    // float drift at the very end of the scan
    last
}

/// Top-left position that puts the agent near `rect`'s center.
pub(crate) fn anchor_point(rect: &Rect, offset: Point, size: Size, bounds: &Bounds) -> Point {
    let c = rect.center() + offset;
    bounds.clamp(Point::new(c.x - size.w / 2.0, c.y - size.h / 2.0))
}

pub(crate) fn choose_target<R: Rng + ?Sized>(
    rng: &mut R,
    elements: &[ElementBox],
    vp: Size,
    band: f32,
    cfg: &PetConfig,
) -> Target {
    let bounds = Bounds::new(vp, band, cfg.size, cfg.padding);
    let candidates = collect_candidates(elements, vp, band, cfg);

    match weighted_pick(rng, &candidates, |e| tag_weight(e.tag, &cfg.weights)) {
        Some(i) => {
            let e = &candidates[i];
            let offset = Point::new(
                jitter(rng, cfg.jitter.x),
                jitter(rng, cfg.jitter.y),
            );
            Target {
                point: anchor_point(&e.rect, offset, cfg.size, &bounds),
                element: Some(ElementRef {
                    id: e.id,
                    tag: e.tag,
                    offset,
                }),
            }
        }
        None => Target::free(bounds.random_point(rng)),
    }
}

fn jitter<R: Rng + ?Sized>(rng: &mut R, amp: f32) -> f32 {
    if amp > 0.0 {
        rng.gen_range(-amp..amp)
    } else {
        0.0
    }
}

/// Re-resolve a target after the viewport changed. `None` means drop it.
pub(crate) fn remeasure<P: Page + ?Sized>(
    page: &P,
    target: &Target,
    band: f32,
    cfg: &PetConfig,
) -> Option<Target> {
    let vp = page.viewport();
    let bounds = Bounds::new(vp, band, cfg.size, cfg.padding);
    match target.element {
        None => Some(Target::free(bounds.clamp(target.point))),
        Some(r) => {
            let e = page.measure(r.id)?;
            if !is_candidate(&e, vp, band, cfg) {
                return None;
            }
            Some(Target {
                point: anchor_point(&e.rect, r.offset, cfg.size, &bounds),
                element: Some(r),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Positioning;
    use proptest::prelude::*;
    use rand::{rngs::StdRng, SeedableRng};

    fn el(id: usize, tag: Tag, rect: Rect, positioning: Positioning) -> ElementBox {
        ElementBox {
            id: ElementId(id),
            tag,
            rect,
            positioning,
            ignored: false,
        }
    }

    const VP: Size = Size { w: 80.0, h: 30.0 };

    #[test]
    fn band_chains_header_and_stuck_nav() {
        let els = [
            el(0, Tag::Other, Rect::new(0.0, 0.0, 80.0, 2.0), Positioning::Fixed),
            el(1, Tag::Other, Rect::new(0.0, 2.0, 80.0, 1.0), Positioning::Sticky),
            el(2, Tag::Button, Rect::new(70.0, 25.0, 8.0, 2.0), Positioning::Fixed),
            el(3, Tag::P, Rect::new(0.0, 0.0, 80.0, 10.0), Positioning::Flow),
        ];
        assert_eq!(compute_band(&els, VP), 3.0);
    }

    #[test]
    fn band_ignores_unstuck_sticky() {
        let els = [
            el(0, Tag::Other, Rect::new(0.0, 0.0, 80.0, 2.0), Positioning::Fixed),
            el(1, Tag::Other, Rect::new(0.0, 12.0, 80.0, 1.0), Positioning::Sticky),
        ];
        assert_eq!(compute_band(&els, VP), 2.0);
    }

    #[test]
    fn candidates_skip_band_pinned_ignored_and_tiny() {
        let cfg = PetConfig::default();
        let mut ignored = el(4, Tag::Img, Rect::new(10.0, 10.0, 10.0, 4.0), Positioning::Flow);
        ignored.ignored = true;
        let els = [
            el(0, Tag::P, Rect::new(0.0, 1.0, 40.0, 3.0), Positioning::Flow),
            el(1, Tag::Button, Rect::new(0.0, 0.0, 10.0, 2.0), Positioning::Fixed),
            el(2, Tag::A, Rect::new(5.0, 8.0, 1.0, 1.0), Positioning::Flow),
            el(3, Tag::Other, Rect::new(5.0, 8.0, 20.0, 3.0), Positioning::Flow),
            ignored,
            el(5, Tag::Img, Rect::new(30.0, 12.0, 12.0, 5.0), Positioning::Flow),
            el(6, Tag::P, Rect::new(30.0, 40.0, 12.0, 5.0), Positioning::Flow),
        ];
        let got: Vec<usize> = collect_candidates(&els, VP, 3.0, &cfg)
            .iter()
            .map(|e| e.id.0)
            .collect();
        assert_eq!(got, vec![5]);
    }

    #[test]
    fn weighted_pick_follows_weights() {
        let mut rng = StdRng::seed_from_u64(7);
        let weights = [5.0f32, 3.0, 1.0, 0.0];
        let mut hits = [0u32; 4];
        let n = 90_000;
        for _ in 0..n {
            let i = weighted_pick(&mut rng, &weights, |w| *w).unwrap();
            hits[i] += 1;
        }
        let frac = |i: usize| hits[i] as f32 / n as f32;
        assert!((frac(0) - 5.0 / 9.0).abs() < 0.01);
        assert!((frac(1) - 3.0 / 9.0).abs() < 0.01);
        assert!((frac(2) - 1.0 / 9.0).abs() < 0.01);
        assert_eq!(hits[3], 0);
    }

    #[test]
    fn weighted_pick_empty_or_zero() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(weighted_pick(&mut rng, &[] as &[f32], |w| *w), None);
        assert_eq!(weighted_pick(&mut rng, &[0.0f32, -1.0], |w| *w), None);
    }

    #[test]
    fn falls_back_to_free_point_below_band() {
        let cfg = PetConfig::default();
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..500 {
            let t = choose_target(&mut rng, &[], VP, 4.0, &cfg);
            assert!(t.element.is_none());
            assert!(t.point.y >= 4.0 + cfg.padding);
            assert!(t.point.y + cfg.size.h <= VP.h - cfg.padding);
            assert!(t.point.x >= cfg.padding);
            assert!(t.point.x + cfg.size.w <= VP.w - cfg.padding);
        }
    }

    #[test]
    fn element_target_lands_near_center() {
        let cfg = PetConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        let els = [el(9, Tag::Img, Rect::new(20.0, 10.0, 20.0, 6.0), Positioning::Flow)];
        let t = choose_target(&mut rng, &els, VP, 3.0, &cfg);
        let r = t.element.expect("element target");
        assert_eq!(r.id, ElementId(9));
        let center = Point::new(t.point.x + cfg.size.w / 2.0, t.point.y + cfg.size.h / 2.0);
        assert!((center.x - 30.0).abs() <= cfg.jitter.x + 1e-3);
        assert!((center.y - 13.0).abs() <= cfg.jitter.y + 1e-3);
    }

    #[test]
    fn tiny_viewport_clamps_without_panic() {
        let b = Bounds::new(Size::new(2.0, 1.0), 5.0, Size::new(3.0, 1.0), 1.0);
        let p = b.clamp(Point::new(50.0, -50.0));
        assert_eq!(p, Point::new(1.0, 6.0));
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(b.random_point(&mut rng), Point::new(1.0, 6.0));
    }

    proptest! {
        #[test]
        fn clamped_points_stay_below_band(
            x in -500.0f32..500.0,
            y in -500.0f32..500.0,
            w in 10.0f32..300.0,
            h in 6.0f32..200.0,
            band in 0.0f32..4.0,
        ) {
            let b = Bounds::new(Size::new(w, h), band, Size::new(3.0, 1.0), 1.0);
            let p = b.clamp(Point::new(x, y));
            prop_assert!(p.y >= band);
            prop_assert!(p.x >= 0.0);
        }
    }
}
