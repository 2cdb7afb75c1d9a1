use crate::geometry::{primary_display, CoordinateSpace, Display, Point, ScreenRect};

/// Conversion between window-manager, canonical and overlay-local space.
///
/// Every flip in the crate goes through here. The flip height for a rectangle
/// is taken from the display it overlaps most, never from a global constant.
pub struct CoordinateConverter;

impl CoordinateConverter {
    /// `y' = screen_height - y - height`.
    pub fn to_canonical(rect: ScreenRect, screen_height: f64) -> ScreenRect {
        ScreenRect::new(
            CoordinateSpace::Canonical,
            rect.x,
            screen_height - rect.y - rect.height,
            rect.width,
            rect.height,
        )
    }

    /// The flip is its own inverse; only the space tag differs.
    pub fn from_canonical(rect: ScreenRect, screen_height: f64) -> ScreenRect {
        ScreenRect::new(
            CoordinateSpace::WindowManager,
            rect.x,
            screen_height - rect.y - rect.height,
            rect.width,
            rect.height,
        )
    }

    /// Translate by the element origin, then flip within the element height.
    pub fn to_overlay_local(rect: ScreenRect, element_frame: ScreenRect) -> ScreenRect {
        let local_x = rect.x - element_frame.x;
        let local_y = element_frame.height - (rect.y - element_frame.y) - rect.height;
        ScreenRect::new(
            CoordinateSpace::OverlayLocal,
            local_x,
            local_y,
            rect.width,
            rect.height,
        )
    }

    pub fn from_overlay_local(rect: ScreenRect, element_frame: ScreenRect) -> ScreenRect {
        let x = rect.x + element_frame.x;
        let y = element_frame.y + element_frame.height - rect.y - rect.height;
        ScreenRect::new(CoordinateSpace::Canonical, x, y, rect.width, rect.height)
    }

    pub fn point_to_canonical(point: Point, screen_height: f64) -> Point {
        Point::new(point.x, screen_height - point.y)
    }

    pub fn point_to_overlay_local(point: Point, element_frame: ScreenRect) -> Point {
        Point::new(
            point.x - element_frame.x,
            element_frame.height - (point.y - element_frame.y),
        )
    }

    pub fn point_from_overlay_local(point: Point, element_frame: ScreenRect) -> Point {
        Point::new(
            point.x + element_frame.x,
            element_frame.y + element_frame.height - point.y,
        )
    }

    /// Display whose canonical frame overlaps `rect` the most. Falls back to
    /// the primary display when nothing overlaps.
    pub fn screen_for_rect(rect: &ScreenRect, displays: &[Display]) -> Option<Display> {
        let best = displays
            .iter()
            .map(|display| (display, display.frame.intersection_area(rect)))
            .filter(|(_, area)| *area > 0.0)
            .fold(None::<(&Display, f64)>, |best, candidate| match best {
                Some((_, best_area)) if best_area >= candidate.1 => best,
                _ => Some(candidate),
            })
            .map(|(display, _)| *display);
        best.or_else(|| primary_display(displays).copied())
    }

    pub fn flip_height_for(rect: &ScreenRect, displays: &[Display]) -> Option<f64> {
        Self::screen_for_rect(rect, displays).map(|display| display.frame.height)
    }

    /// Window-manager rectangle to canonical, choosing the flip display from `displays`.
    pub fn window_manager_to_canonical(
        rect: ScreenRect,
        displays: &[Display],
    ) -> Option<ScreenRect> {
        let height = Self::flip_height_for(&rect, displays)?;
        Some(Self::to_canonical(rect, height))
    }
}

#[cfg(test)]
mod tests {
    use super::CoordinateConverter;
    use crate::geometry::{CoordinateSpace, Display, Point, ScreenRect};

    fn primary(height: f64) -> Display {
        Display::new(ScreenRect::canonical(0.0, 0.0, 1440.0, height), true)
    }

    #[test]
    fn element_on_primary_display_flips_to_canonical() {
        let element = ScreenRect::window_manager(100.0, 100.0, 400.0, 40.0);
        let canonical = CoordinateConverter::window_manager_to_canonical(element, &[primary(900.0)])
            .expect("display available");
        assert_eq!(canonical, ScreenRect::canonical(100.0, 760.0, 400.0, 40.0));
    }

    #[test]
    fn overlay_local_flips_within_element_height() {
        let element_frame = ScreenRect::canonical(100.0, 760.0, 400.0, 40.0);
        // Text band 10 units below the element top in canonical space.
        let text = ScreenRect::canonical(150.0, 772.0, 60.0, 18.0);
        let local = CoordinateConverter::to_overlay_local(text, element_frame);
        assert_eq!(local, ScreenRect::local(50.0, 10.0, 60.0, 18.0));
    }

    #[test]
    fn secondary_display_with_largest_overlap_supplies_flip_height() {
        let displays = [
            primary(900.0),
            Display::new(ScreenRect::canonical(1440.0, 0.0, 1920.0, 1200.0), false),
        ];
        let window = ScreenRect::window_manager(1500.0, 200.0, 600.0, 300.0);
        let screen = CoordinateConverter::screen_for_rect(&window, &displays).expect("screen");
        assert_eq!(screen.frame.height, 1200.0);

        let straddling = ScreenRect::window_manager(1400.0, 10.0, 100.0, 20.0);
        let screen = CoordinateConverter::screen_for_rect(&straddling, &displays).expect("screen");
        assert_eq!(screen.frame.height, 1200.0);
    }

    #[test]
    fn offscreen_rect_falls_back_to_primary() {
        let displays = [
            Display::new(ScreenRect::canonical(1440.0, 0.0, 1920.0, 1200.0), false),
            primary(900.0),
        ];
        let nowhere = ScreenRect::window_manager(-9000.0, -9000.0, 10.0, 10.0);
        let screen = CoordinateConverter::screen_for_rect(&nowhere, &displays).expect("screen");
        assert!(screen.primary);
    }

    #[test]
    fn pointer_conversion_matches_rect_conversion() {
        let surface_wm = ScreenRect::window_manager(100.0, 100.0, 400.0, 40.0);
        let surface = CoordinateConverter::to_canonical(surface_wm, 900.0);
        let pointer = Point::new(150.0, 112.0);
        let canonical = CoordinateConverter::point_to_canonical(pointer, 900.0);
        let local = CoordinateConverter::point_to_overlay_local(canonical, surface);
        assert_eq!(local, Point::new(50.0, 12.0));
        assert_eq!(
            CoordinateConverter::point_from_overlay_local(local, surface),
            canonical
        );
    }

    #[test]
    fn space_tags_follow_conversion() {
        let rect = ScreenRect::window_manager(1.0, 2.0, 3.0, 4.0);
        let canonical = CoordinateConverter::to_canonical(rect, 100.0);
        assert_eq!(canonical.space, CoordinateSpace::Canonical);
        let back = CoordinateConverter::from_canonical(canonical, 100.0);
        assert_eq!(back, rect);
    }
}
