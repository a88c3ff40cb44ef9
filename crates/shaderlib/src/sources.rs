//! GLSL text for the built-in transition programs.
//!
//! Every fragment program is assembled as `PRELUDE + body + FOOTER`. The body
//! only has to define `vec4 transition(vec2 uv)`; the prelude provides the
//! uniform block, the two sampled surfaces and the `getFromColor` /
//! `getToColor` helpers.

/// Shared full-screen quad vertex stage.
///
/// Consumes the quad's clip-space corner and derives a texture coordinate with
/// the origin in the top-left corner, matching how surfaces are uploaded.
pub const QUAD_VERTEX: &str = r"#version 450
layout(location = 0) in vec2 a_position;
layout(location = 0) out vec2 v_uv;

void main() {
    v_uv = vec2(a_position.x * 0.5 + 0.5, 0.5 - a_position.y * 0.5);
    gl_Position = vec4(a_position, 0.0, 1.0);
}
";

/// Uniform block, texture bindings and sampling helpers shared by all families.
///
/// The block layout must match `TransitionUniforms` in the renderer crate.
pub const PRELUDE: &str = r"#version 450
layout(location = 0) in vec2 v_uv;
layout(location = 0) out vec4 outColor;

layout(std140, set = 0, binding = 0) uniform TransitionParams {
    vec2 _resolution;
    float _progress;
    float _intensity;
    vec2 _direction;
    vec2 _origin;
    vec4 _color;
    vec2 _rgbOffset;
    float _blockCount;
    float _softness;
    float _scale;
    float _rotation;
    float _mode;
    float _seed;
    vec4 _custom[8];
} ubo;

#define u_resolution ubo._resolution
#define u_progress ubo._progress
#define u_intensity ubo._intensity
#define u_direction ubo._direction
#define u_origin ubo._origin
#define u_color ubo._color
#define u_rgb_offset ubo._rgbOffset
#define u_block_count ubo._blockCount
#define u_softness ubo._softness
#define u_scale ubo._scale
#define u_rotation ubo._rotation
#define u_mode ubo._mode
#define u_seed ubo._seed

#define progress ubo._progress
#define ratio (ubo._resolution.x / max(ubo._resolution.y, 1.0))
#define PI 3.141592653589793

layout(set = 0, binding = 1) uniform texture2D u_from_texture;
layout(set = 0, binding = 2) uniform texture2D u_to_texture;
layout(set = 0, binding = 3) uniform sampler u_sampler;

vec4 getFromColor(vec2 uv) {
    return textureLod(sampler2D(u_from_texture, u_sampler), uv, 0.0);
}

vec4 getToColor(vec2 uv) {
    return textureLod(sampler2D(u_to_texture, u_sampler), uv, 0.0);
}

float insideUnit(vec2 uv) {
    vec2 lower = step(vec2(0.0), uv);
    vec2 upper = step(uv, vec2(1.0));
    return lower.x * lower.y * upper.x * upper.y;
}

float hash12(vec2 p) {
    return fract(sin(dot(p, vec2(12.9898, 78.233))) * 43758.5453);
}
";

pub const FOOTER: &str = r"
void main() {
    outColor = transition(v_uv);
}
";

/// Linear interpolation between the two surfaces. Used as the fallback for
/// every family whose program is unavailable.
pub const CROSSFADE: &str = r"
vec4 transition(vec2 uv) {
    return mix(getFromColor(uv), getToColor(uv), u_progress);
}
";

/// `u_mode`: 0 = through a colour, 1 = plain cross fade, 2 = through transparency.
/// `u_color.a` carries the overlay opacity.
pub const FADE: &str = r"
vec4 transition(vec2 uv) {
    vec4 from = getFromColor(uv);
    vec4 to = getToColor(uv);
    if (u_mode > 1.5) {
        float outgoing = clamp(1.0 - u_progress * 2.0, 0.0, 1.0);
        float incoming = clamp(u_progress * 2.0 - 1.0, 0.0, 1.0);
        return from * outgoing + to * incoming;
    }
    if (u_mode > 0.5) {
        return mix(from, to, u_progress);
    }
    vec4 tinted = mix(from, vec4(u_color.rgb, 1.0), u_progress * u_color.a);
    return mix(tinted, to, u_progress);
}
";

/// `u_direction` is the unit travel direction in texture space (y down),
/// `u_scale` the outgoing surface's speed factor (parallax) and `u_softness`
/// the overlap band along the slide axis.
pub const SLIDE: &str = r"
vec4 transition(vec2 uv) {
    float p = u_progress;
    vec2 dir = u_direction;
    vec2 fromUv = uv - dir * p * u_scale;
    vec2 toUv = uv + dir * (1.0 - p);

    float along = dot(uv - vec2(0.5), dir) + 0.5;
    float band = max(u_softness, 0.0001);
    float edge = p * (1.0 + band);
    float reveal = 1.0 - smoothstep(edge - band, edge, along);

    vec4 from = getFromColor(fromUv) * insideUnit(fromUv);
    vec4 to = getToColor(toUv);
    return mix(from, to, reveal);
}
";

/// `u_mode`: 0 = zoom in, 1 = zoom out, 2 = pulsar. `u_intensity` is the peak
/// extra scale, `u_rotation` the total rotation in radians.
pub const ZOOM: &str = r"
vec2 rotateAround(vec2 uv, vec2 origin, float angle) {
    float s = sin(angle);
    float c = cos(angle);
    vec2 local = uv - origin;
    return origin + vec2(local.x * c - local.y * s, local.x * s + local.y * c);
}

vec4 transition(vec2 uv) {
    float p = u_progress;
    float scale;
    if (u_mode > 1.5) {
        scale = 1.0 + u_intensity * sin(p * PI);
    } else if (u_mode > 0.5) {
        scale = 1.0 / (1.0 + u_intensity * p);
    } else {
        scale = 1.0 + u_intensity * p;
    }

    vec2 sampleUv = u_origin + (uv - u_origin) / max(scale, 0.0001);
    sampleUv = rotateAround(sampleUv, u_origin, u_rotation * p);

    vec4 to = getToColor(uv);
    vec4 from = mix(to, getFromColor(sampleUv), insideUnit(sampleUv));
    return mix(from, to, p);
}
";

/// `u_mode`: 0 = linear along `u_direction`, 1 = luma-driven gradient wipe.
pub const WIPE: &str = r"
vec4 transition(vec2 uv) {
    vec4 from = getFromColor(uv);
    vec4 to = getToColor(uv);

    float coord;
    if (u_mode > 0.5) {
        coord = dot(to.rgb, vec3(0.299, 0.587, 0.114));
    } else {
        vec2 dir = normalize(u_direction);
        float extent = max(abs(dir.x) + abs(dir.y), 0.0001);
        coord = dot(uv - vec2(0.5), dir) / extent + 0.5;
    }

    float band = max(u_softness, 0.0001);
    float alpha = 1.0 - smoothstep(coord, coord + band, u_progress * (1.0 + band));
    return mix(to, from, alpha);
}
";

/// Sweeps around `u_origin`. The sign of `u_direction.x` selects the winding,
/// `u_rotation` the starting angle.
pub const RADIAL_WIPE: &str = r"
vec4 transition(vec2 uv) {
    vec2 local = uv - u_origin;
    local.x *= ratio;
    float angle = atan(local.y, local.x) - u_rotation;
    float turns = fract(angle / (2.0 * PI) + 1.0);
    if (u_direction.x < 0.0) {
        turns = 1.0 - turns;
    }

    float band = max(u_softness, 0.0001);
    float alpha = 1.0 - smoothstep(turns, turns + band, u_progress * (1.0 + band));
    return mix(getToColor(uv), getFromColor(uv), alpha);
}
";

/// `u_mode`: 0 = rgb split, 1 = noise, 2 = chromatic, 3 = digital.
/// `u_rgb_offset` is the channel offset in pixels at full strength.
pub const GLITCH: &str = r"
vec2 displaceBlocks(vec2 uv, float amount) {
    float blocks = max(u_block_count, 1.0);
    vec2 cell = floor(uv * blocks);
    float frameStep = floor(u_progress * 24.0);
    float pick = hash12(cell + vec2(u_seed, frameStep));
    vec2 shifted = uv;
    if (pick < amount * 0.5) {
        float shift = hash12(cell.yx + vec2(frameStep, u_seed)) - 0.5;
        if (u_mode > 2.5) {
            shift = floor(shift * 8.0) / 8.0;
        }
        shifted.x += shift * amount * 0.25;
    }
    return shifted;
}

vec4 splitSample(vec2 uv, vec2 offset) {
    float r = getFromColor(uv + offset).r;
    vec4 base = getFromColor(uv);
    float b = getFromColor(uv - offset).b;
    return vec4(r, base.g, b, base.a);
}

vec4 transition(vec2 uv) {
    float amount = clamp(u_progress * u_intensity, 0.0, 1.0);
    vec2 glitched = displaceBlocks(uv, amount);

    vec2 offset = vec2(u_rgb_offset.x, 0.0) * amount / max(u_resolution, vec2(1.0));
    if (u_mode > 1.5 && u_mode < 2.5) {
        vec2 radial = uv - vec2(0.5);
        offset = radial * length(u_rgb_offset) * amount / max(u_resolution.x, 1.0);
    }

    vec4 from = splitSample(glitched, offset);
    if (u_mode > 0.5 && u_mode < 1.5) {
        float grain = hash12(uv * u_resolution + vec2(u_seed, u_progress * 97.0)) - 0.5;
        from.rgb += grain * amount * 0.35;
    }

    vec4 to = getToColor(glitched);
    return mix(from, to, u_progress);
}
";

/// Separable gaussian. `u_mode`: 0 = horizontal pass over both surfaces,
/// 1 = vertical pass (the intermediate target is bound to both slots).
/// `u_intensity` is the peak radius in pixels, reached at mid progress.
pub const BLUR: &str = r"
vec4 transition(vec2 uv) {
    float radius = u_intensity * sin(u_progress * PI);
    vec2 axis = vec2(1.0, 0.0);
    if (u_mode > 0.5) {
        axis = vec2(0.0, 1.0);
    }
    vec2 texel = axis * radius / max(u_resolution, vec2(1.0));

    vec4 from = vec4(0.0);
    vec4 to = vec4(0.0);
    float total = 0.0;
    for (int i = -4; i <= 4; i++) {
        float x = float(i);
        float weight = exp(-(x * x) / 8.0);
        vec2 offset = texel * x / 4.0;
        from += getFromColor(uv + offset) * weight;
        to += getToColor(uv + offset) * weight;
        total += weight;
    }
    return mix(from / total, to / total, u_progress);
}
";

/// Per-cell threshold dissolve. `u_block_count` is the cell size in pixels.
pub const DISSOLVE: &str = r"
vec4 transition(vec2 uv) {
    vec2 cell = floor(uv * u_resolution / max(u_block_count, 1.0));
    float threshold = hash12(cell + vec2(u_seed));
    float band = max(u_softness, 0.0001);
    float reveal = smoothstep(threshold, threshold + band, u_progress * (1.0 + band));
    return mix(getFromColor(uv), getToColor(uv), reveal);
}
";
